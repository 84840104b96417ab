//! gRPC handlers for the `jwts_v1.Jwk` and `jwts_v1.Jwt` services.

use crate::app::Jwts;
use crate::error::TokenError;
use crate::jwt::parse_payload;
use crate::metrics;
use crate::proto::jwts_v1::jwk_server::{Jwk, JwkServer};
use crate::proto::jwts_v1::jwt_server::{Jwt, JwtServer};
use crate::proto::jwts_v1::{
    JwkMain, JwkSet, JwtCreateRep, JwtCreateReq, JwtValidateRep, JwtValidateReq,
};
use crate::proto::FILE_DESCRIPTOR_SET;
use std::sync::Arc;
use std::time::Instant;
use tonic::{Request, Response, Status};
use tonic_reflection::server::v1::{ServerReflection, ServerReflectionServer};
use tracing::{error, instrument};

#[derive(Clone)]
pub struct JwtsGrpc {
    core: Arc<Jwts>,
}

impl JwtsGrpc {
    pub fn new(core: Arc<Jwts>) -> Self {
        JwtsGrpc { core }
    }

    pub fn jwk_server(&self) -> JwkServer<Self> {
        JwkServer::new(self.clone())
    }

    pub fn jwt_server(&self) -> JwtServer<Self> {
        JwtServer::new(self.clone())
    }
}

/// Server reflection over the `jwts_v1` descriptors.
///
/// # Errors
///
/// Returns `Internal` if the embedded descriptor set cannot be decoded.
pub fn reflection_server() -> Result<ServerReflectionServer<impl ServerReflection>, TokenError> {
    tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()
        .map_err(|e| TokenError::Internal(format!("gRPC reflection: {e}")))
}

fn finish<T>(
    method: &str,
    started: Instant,
    result: Result<T, TokenError>,
) -> Result<Response<T>, Status> {
    let status = match &result {
        Ok(_) => "OK".to_string(),
        Err(e) => format!("{:?}", e.grpc_code()),
    };
    metrics::record_request("grpc", method, &status, started.elapsed().as_secs_f64());

    result.map(Response::new).map_err(|e| {
        error!(method, error = %e, "gRPC request failed");
        Status::from(e)
    })
}

#[tonic::async_trait]
impl Jwk for JwtsGrpc {
    async fn get(&self, _request: Request<()>) -> Result<Response<JwkSet>, Status> {
        let started = Instant::now();
        let keys = self
            .core
            .jwk_set()
            .map(|set| {
                set.keys
                    .iter()
                    .map(|key| JwkMain {
                        kty: key.kty.clone(),
                        e: key.e.clone(),
                        kid: key.kid.clone(),
                        alg: key.alg.clone(),
                        n: key.n.clone(),
                        r#use: key.key_use.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        finish("Jwk/Get", started, Ok(JwkSet { keys }))
    }
}

#[tonic::async_trait]
impl Jwt for JwtsGrpc {
    #[instrument(skip(self, request))]
    async fn create(
        &self,
        request: Request<JwtCreateReq>,
    ) -> Result<Response<JwtCreateRep>, Status> {
        let started = Instant::now();
        let req = request.into_inner();

        let result = parse_payload(&req.payload)
            .and_then(|payload| self.core.create(&req.sub, req.exp_seconds, payload))
            .map(|token| JwtCreateRep { token });

        finish("Jwt/Create", started, result)
    }

    #[instrument(skip(self, request))]
    async fn validate(
        &self,
        request: Request<JwtValidateReq>,
    ) -> Result<Response<JwtValidateRep>, Status> {
        let started = Instant::now();
        let req = request.into_inner();

        let result = self.core.validate(&req.token).and_then(|validation| {
            let claims = serde_json::to_vec(&validation.claims)
                .map_err(|e| TokenError::Internal(format!("encode claims: {e}")))?;
            Ok(JwtValidateRep {
                valid: validation.valid,
                claims,
            })
        });

        finish("Jwt/Validate", started, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwks::JwksPublisher;
    use crate::jwt::{TokenIssuer, TokenValidator};
    use crate::keys::KeyStore;
    use tonic::Code;

    const PRIVATE_PEM: &[u8] = include_bytes!("../../tests/fixtures/private.pem");
    const PUBLIC_PEM: &[u8] = include_bytes!("../../tests/fixtures/public.pem");

    async fn handler(private: Option<&[u8]>, public: Option<&[u8]>) -> JwtsGrpc {
        let mut store = KeyStore::new("key1");
        store.set_keys(private, public).unwrap();
        let store = Arc::new(store);

        let publisher = JwksPublisher::new(store.clone());
        publisher.build_once().await.unwrap();
        let core = Jwts::new(
            publisher,
            TokenIssuer::new(store.clone(), "issuer"),
            TokenValidator::new(store),
        );
        JwtsGrpc::new(Arc::new(core))
    }

    #[tokio::test]
    async fn test_get_jwk_set() {
        let grpc = handler(None, Some(PUBLIC_PEM)).await;
        let set = grpc.get(Request::new(())).await.unwrap().into_inner();
        assert_eq!(set.keys.len(), 1);
        assert_eq!(set.keys[0].kid, "key1");
        assert_eq!(set.keys[0].r#use, "sig");
    }

    #[tokio::test]
    async fn test_get_without_keys_is_empty() {
        let grpc = handler(None, None).await;
        let set = grpc.get(Request::new(())).await.unwrap().into_inner();
        assert!(set.keys.is_empty());
    }

    #[tokio::test]
    async fn test_create_then_validate() {
        let grpc = handler(Some(PRIVATE_PEM), Some(PUBLIC_PEM)).await;

        let token = grpc
            .create(Request::new(JwtCreateReq {
                sub: "user1".to_string(),
                exp_seconds: 60,
                payload: br#"{"role":"admin"}"#.to_vec(),
            }))
            .await
            .unwrap()
            .into_inner()
            .token;

        let rep = grpc
            .validate(Request::new(JwtValidateReq { token }))
            .await
            .unwrap()
            .into_inner();
        assert!(rep.valid);
        let claims: serde_json::Value = serde_json::from_slice(&rep.claims).unwrap();
        assert_eq!(claims["role"], "admin");
        assert_eq!(claims["sub"], "user1");
    }

    #[tokio::test]
    async fn test_create_rejects_non_object_payload() {
        let grpc = handler(Some(PRIVATE_PEM), None).await;
        let status = grpc
            .create(Request::new(JwtCreateReq {
                sub: "user1".to_string(),
                exp_seconds: 0,
                payload: b"[1,2,3]".to_vec(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[test]
    fn test_descriptor_set_lists_services() {
        use prost::Message;

        let set = prost_types::FileDescriptorSet::decode(FILE_DESCRIPTOR_SET).unwrap();
        let file = set
            .file
            .iter()
            .find(|f| f.package() == "jwts_v1")
            .unwrap();
        let services: Vec<&str> = file.service.iter().map(|s| s.name()).collect();
        assert_eq!(services, vec!["Jwk", "Jwt"]);
        assert!(set.file.iter().any(|f| f.name() == "google/protobuf/empty.proto"));
    }

    #[test]
    fn test_reflection_server_builds() {
        assert!(reflection_server().is_ok());
    }

    #[tokio::test]
    async fn test_validate_without_public_key() {
        let grpc = handler(Some(PRIVATE_PEM), None).await;
        let status = grpc
            .validate(Request::new(JwtValidateReq {
                token: "a.b.c".to_string(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::FailedPrecondition);
    }
}
