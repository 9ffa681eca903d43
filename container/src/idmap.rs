//! Rootless uid/gid remapping.
//!
//! Container root maps onto an unprivileged host range while the invoking
//! user keeps its own id inside the container, so files created there by the
//! install step stay writable from the host.

use crate::error::ContainerError;
use lxcify_shim::{ConfigItem, IDMAP_KEY, Runtime};
use nix::fcntl::{Flock, FlockArg};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// First host id of the subordinate range.
pub const ID_MAP_START: u32 = 100000;
/// Number of ids remapped per axis.
pub const ID_MAP_RANGE: u32 = 65535;

/// Unprivileged user created by the distribution images.
pub const CONTAINER_USER: &str = "ubuntu";

/// The six `lxc.idmap` entries for host `uid`/`gid`, users and groups
/// interleaved: root range, 1:1 passthrough, remainder.
pub fn id_map_entries(uid: u32, gid: u32) -> Result<Vec<ConfigItem>, ContainerError> {
    for id in [uid, gid] {
        if id >= ID_MAP_RANGE {
            return Err(ContainerError::IdOutOfRange {
                id,
                range: ID_MAP_RANGE,
            });
        }
    }

    let entry = |value: String| ConfigItem::new(IDMAP_KEY, value);
    Ok(vec![
        entry(format!("u 0 {} {}", ID_MAP_START, uid)),
        entry(format!("g 0 {} {}", ID_MAP_START, gid)),
        entry(format!("u {} {} 1", uid, uid)),
        entry(format!("g {} {} 1", gid, gid)),
        entry(format!(
            "u {} {} {}",
            uid + 1,
            ID_MAP_START + uid + 1,
            ID_MAP_RANGE - uid
        )),
        entry(format!(
            "g {} {} {}",
            gid + 1,
            ID_MAP_START + gid + 1,
            ID_MAP_RANGE - gid
        )),
    ])
}

/// Drops every line whose key is `key`; all other lines, blank lines and
/// comments included, are kept byte for byte and in order.
pub fn strip_config_key(contents: &str, key: &str) -> String {
    contents
        .split_inclusive('\n')
        .filter(|line| !line_has_key(line, key))
        .collect()
}

fn line_has_key(line: &str, key: &str) -> bool {
    match line.trim_start().strip_prefix(key) {
        Some(rest) => rest.starts_with(|c: char| c == '=' || c.is_ascii_whitespace()),
        None => false,
    }
}

/// Removes all id map entries from the container's configuration.
///
/// The runtime can only clear its configuration wholesale, so the persisted
/// file is filtered line by line and reloaded. The file stays locked for the
/// whole read, rewrite and reload sequence.
pub async fn clear_id_map<R: Runtime + ?Sized>(runtime: &R) -> Result<(), ContainerError> {
    let path = runtime.config_file_name();

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&path)
        .map_err(ContainerError::io(&path))?;
    let mut file = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| {
        ContainerError::Io {
            path: path.clone(),
            source: errno.into(),
        }
    })?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(ContainerError::io(&path))?;

    runtime
        .clear_config()
        .await
        .map_err(ContainerError::runtime("clear config"))?;

    rewrite(&mut file, &strip_config_key(&contents, IDMAP_KEY)).map_err(ContainerError::io(&path))?;

    runtime
        .load_config_file(&path)
        .await
        .map_err(ContainerError::runtime(format!("load config {:?}", path)))?;

    tracing::debug!(container = %runtime.name(), path = ?path, "Cleared id map entries");
    Ok(())
}

fn rewrite(file: &mut File, contents: &str) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(contents.as_bytes())?;
    file.flush()
}

/// Replaces the container's id map with the passthrough map for the
/// invoking host user, then hands the container user's home to that user.
pub async fn setup_user_passthru<R: Runtime + ?Sized>(runtime: &R) -> Result<(), ContainerError> {
    clear_id_map(runtime).await?;

    let uid = nix::unistd::getuid().as_raw();
    let gid = nix::unistd::getgid().as_raw();

    for item in id_map_entries(uid, gid)? {
        runtime
            .set_config_item(&item.key, &item.value)
            .await
            .map_err(ContainerError::runtime(format!("set config {}", item)))?;
    }

    let home = runtime
        .container_dir()
        .join("rootfs")
        .join("home")
        .join(CONTAINER_USER);
    chown_home(&home, uid, gid).await
}

/// The rootfs was unpacked before the id map existed, so its files belong to
/// the mapped root range.
async fn chown_home(home: &Path, uid: u32, gid: u32) -> Result<(), ContainerError> {
    if !tokio::fs::try_exists(home)
        .await
        .map_err(ContainerError::io(home))?
    {
        tracing::warn!(path = ?home, "Container home directory not found, skipping ownership fix");
        return Ok(());
    }

    tracing::info!(path = ?home, uid = uid, gid = gid, "Changing ownership of container home");

    let status = tokio::process::Command::new("sudo")
        .arg("chown")
        .arg("-R")
        .arg(format!("{}:{}", uid, gid))
        .arg(home)
        .status()
        .await
        .map_err(ContainerError::io(home))?;

    if !status.success() {
        return Err(ContainerError::Io {
            path: home.to_path_buf(),
            source: std::io::Error::other(format!("chown exited with {}", status)),
        });
    }
    Ok(())
}
