// Extension traits for third-party types, grouped under `crate::ext`.

pub mod serde_json;
