use std::path::PathBuf;

pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

pub fn specifications_root() -> PathBuf {
    workspace_root().join("specifications")
}

pub fn specification_path(name: &str) -> PathBuf {
    specifications_root().join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_root_points_to_workspace() {
        assert!(workspace_root().join("Cargo.toml").exists());
    }

    #[test]
    fn specifications_root_points_to_samples() {
        assert!(specifications_root().is_dir());
    }

    #[test]
    fn specification_path_joins_name() {
        assert!(specification_path("functions.lexy").is_file());
    }
}
