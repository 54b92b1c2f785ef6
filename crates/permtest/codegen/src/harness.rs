//! Runtime harness text woven into every generated unit.

use serde::Deserialize;
use std::path::PathBuf;

/// Code that surrounds every case.
///
/// The defaults target the littlefs emulated block device: `setup`
/// declares the usual locals and creates the `blocks` store, `teardown`
/// destroys it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Emitted at the top of the unit, before any case.
    pub preamble: String,
    /// Emitted at the start of every case body.
    pub setup: String,
    /// Emitted at the end of every case body.
    pub teardown: String,
    /// Extra sources linked into every test binary.
    pub sources: Vec<PathBuf>,
}

const PREAMBLE: &str = r#"#include "lfs.h"
#include "emubd/lfs_emubd.h"
#include <stdio.h>
"#;

const SETUP: &str = r#"    // prologue
    __attribute__((unused)) lfs_t lfs;
    __attribute__((unused)) lfs_emubd_t bd;
    __attribute__((unused)) lfs_file_t file;
    __attribute__((unused)) lfs_dir_t dir;
    __attribute__((unused)) struct lfs_info info;
    __attribute__((unused)) uint8_t buffer[1024];
    __attribute__((unused)) char path[1024];

    __attribute__((unused)) const struct lfs_config cfg = {
        .context = &bd,
        .read  = &lfs_emubd_read,
        .prog  = &lfs_emubd_prog,
        .erase = &lfs_emubd_erase,
        .sync  = &lfs_emubd_sync,

        .read_size      = LFS_READ_SIZE,
        .prog_size      = LFS_PROG_SIZE,
        .block_size     = LFS_BLOCK_SIZE,
        .block_count    = LFS_BLOCK_COUNT,
        .block_cycles   = LFS_BLOCK_CYCLES,
        .cache_size     = LFS_CACHE_SIZE,
        .lookahead_size = LFS_LOOKAHEAD_SIZE,
    };

    lfs_emubd_create(&cfg, "blocks");
"#;

const TEARDOWN: &str = r#"    // epilogue
    lfs_emubd_destroy(&cfg);
"#;

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            preamble: PREAMBLE.to_string(),
            setup: SETUP.to_string(),
            teardown: TEARDOWN.to_string(),
            sources: vec![
                PathBuf::from("lfs.c"),
                PathBuf::from("lfs_util.c"),
                PathBuf::from("emubd/lfs_emubd.c"),
            ],
        }
    }
}
