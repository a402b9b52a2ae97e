//! Fixtures shared by the integration tests.

use devrig_secrets::{FileSecretStore, KeySource};
use devrig_stream::{encode_frame, StreamType};
use std::path::Path;

/// Master key used by keystore tests.
pub const TEST_MASTER_KEY: [u8; 32] = [0x5a; 32];

/// Wire bytes for a sequence of frames.
pub fn wire(frames: &[(StreamType, &[u8])]) -> Vec<u8> {
    frames
        .iter()
        .flat_map(|(stream_type, payload)| {
            encode_frame(*stream_type, payload).expect("payload fits a frame")
        })
        .collect()
}

/// A keystore in `dir` keyed by [`TEST_MASTER_KEY`].
pub fn master_key_store(dir: &Path) -> FileSecretStore {
    let source = KeySource::master_key(&TEST_MASTER_KEY).expect("32-byte key");
    FileSecretStore::new(dir.to_path_buf(), source)
}
