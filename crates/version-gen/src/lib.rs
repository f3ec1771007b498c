//! A build-script library that stamps a crate with a version string derived from git state.

use std::path::Path;

use git2::{Repository, StatusOptions};

/// Set the build-time env var `var` to the annotated version number of the crate being built.
///
/// From a clean checkout of a tagged commit the version is simply `CARGO_PKG_VERSION`. Otherwise
/// it is suffixed with the short hash of `HEAD`, plus `-dirty` when there are uncommitted changes.
/// Outside of a git repository (e.g. a source tarball) the plain package version is used.
///
/// `manifest_path` is the directory of the crate being built. This is required to recreate cargo's
/// default re-run behavior for build scripts.
pub fn gen_version(var: &str, manifest_path: impl AsRef<Path>) -> anyhow::Result<()> {
    let pkg_version = std::env::var("CARGO_PKG_VERSION")?;
    monitor_files(manifest_path)?;

    let version = match Repository::open_from_env() {
        Ok(repo) => {
            watch_repo(&repo);
            describe(&repo, &pkg_version).unwrap_or_else(|e| {
                println!("cargo:warning=Unable to describe git HEAD: {e}");
                pkg_version.clone()
            })
        }
        Err(_) => pkg_version,
    };
    println!("cargo:rustc-env={var}={version}");

    Ok(())
}

fn describe(repo: &Repository, pkg_version: &str) -> Result<String, git2::Error> {
    let head = repo.head()?.peel_to_commit()?;
    let dirty = !repo
        .statuses(Some(StatusOptions::new().include_untracked(true)))?
        .is_empty();

    let mut tagged = false;
    for name in repo.tag_names(None)?.iter().flatten() {
        let target = repo
            .revparse_single(&format!("refs/tags/{name}"))?
            .peel_to_commit()?;
        if target.id() == head.id() {
            tagged = true;
            break;
        }
    }

    if tagged && !dirty {
        return Ok(pkg_version.to_owned());
    }
    let short = head.as_object().short_id()?;
    let short = short.as_str().unwrap_or_default();
    Ok(format!(
        "{pkg_version}-{short}{}",
        if dirty { "-dirty" } else { "" }
    ))
}

fn watch_repo(repo: &Repository) {
    let path = repo.path();
    let mut watched = vec![path.join("HEAD"), path.join("refs/tags")];
    if let Some(name) = repo
        .find_reference("HEAD")
        .and_then(|r| r.resolve())
        .ok()
        .and_then(|r| r.name().map(str::to_owned))
    {
        watched.push(path.join(name));
    }

    for p in watched.into_iter().filter(|p| p.exists()) {
        println!("cargo:rerun-if-changed={}", p.display());
    }
}

// Adding the git repo files to "rerun-if-changed" disables the default behavior of watching the
// whole package, so the package sources are listed here as well.
fn monitor_files(dir: impl AsRef<Path>) -> std::io::Result<()> {
    for ent in std::fs::read_dir(dir)? {
        let ent = ent?;
        if ent.file_type()?.is_dir() {
            if ent.file_name() != "target" {
                monitor_files(ent.path())?;
            }
        } else {
            println!("cargo:rerun-if-changed={}", ent.path().display());
        }
    }

    Ok(())
}
