use std::path::PathBuf;

use prost::Message;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_dir = "proto";
    let protos = ["externalscaler.proto"];

    println!("cargo:rerun-if-changed={}", proto_dir);

    // Compile in-process so no `protoc` is required, then hand the
    // descriptors to tonic-build.
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    let file_descriptor_set_path: PathBuf = out_dir.join("externalscaler_descriptor.bin");

    let file_descriptors = protox::compile(protos, [proto_dir])?;
    std::fs::write(&file_descriptor_set_path, file_descriptors.encode_to_vec())?;

    tonic_build::configure()
        .build_client(false)
        .file_descriptor_set_path(file_descriptor_set_path.as_path())
        .skip_protoc_run()
        .compile_protos(&protos, &[proto_dir])?;

    Ok(())
}
