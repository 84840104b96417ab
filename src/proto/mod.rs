//! gRPC bindings generated from `proto/jwts_v1.proto` at build time.

pub mod jwts_v1 {
    #![allow(clippy::all)]
    tonic::include_proto!("jwts_v1");
}

/// Encoded descriptors for the `jwts_v1` services, served by reflection.
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("jwts_v1_descriptor");
