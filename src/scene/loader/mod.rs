pub mod fbx_document;
pub mod fbx_binary;
pub mod fbx_convert;
pub mod obj_reader;
pub mod fbx_loader;
pub mod gltf_buffers;
pub mod gltf_loader;

pub use fbx_document::HalaFbxDocument;
pub use fbx_loader::HalaFbxImporter;
pub use gltf_loader::HalaGltfImporter;
