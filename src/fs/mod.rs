pub mod atomic;
pub mod backup;
pub mod meta;
pub mod perms;

pub use atomic::{
    atomic_symlink_swap, fsync_parent_dir, open_dir_nofollow, stage_file, sweep_stale_temps,
    write_atomic, StagedFile,
};
pub use backup::{backup_file, backup_path_with_tag, list_backups};
pub use meta::{kind_of, mode_of, owner_of, resolve_symlink_target, sha256_hex_of, NodeKind};
pub use perms::{chown_tree, count_foreign_owned, set_mode, set_owner};
