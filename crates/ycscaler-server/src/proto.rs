//! Generated `externalscaler` protobuf types and gRPC service stubs.

tonic::include_proto!("externalscaler");

/// Encoded descriptors of `externalscaler.proto`, for server reflection.
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("externalscaler_descriptor");
