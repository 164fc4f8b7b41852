/**
 * This module contains all logic for loading meshes and textures from the
 * asset folder.
 */
pub mod mesh;

use std::path::PathBuf;

use anyhow::Context;

use crate::data_structures::texture;

/// Location of `file_name` inside the asset folder. Absolute paths are
/// returned unchanged.
pub fn asset_path(file_name: &str) -> PathBuf {
    std::path::Path::new("./").join("assets").join(file_name)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    let path = asset_path(file_name);
    let txt = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("could not read {}", path.display()))?;
    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = asset_path(file_name);
    let data = tokio::fs::read(&path)
        .await
        .with_context(|| format!("could not read {}", path.display()))?;
    Ok(data)
}

/// Load an image from the asset folder into a GPU texture.
///
/// The image format is guessed from the file contents. Normal maps are kept
/// linear, everything else is treated as sRGB.
pub async fn load_texture(
    file_name: &str,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<texture::Texture> {
    let data = load_binary(file_name).await?;
    texture::Texture::from_bytes(device, queue, &data, file_name, is_normal_map)
        .with_context(|| format!("{file_name} is not a supported image"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assets_are_relative_to_working_directory() {
        assert_eq!(
            asset_path("Cube.obj"),
            PathBuf::from("./assets/Cube.obj")
        );
        let absolute = std::env::temp_dir().join("Cube.obj");
        assert_eq!(asset_path(&absolute.to_string_lossy()), absolute);
    }

    #[tokio::test]
    async fn missing_files_name_the_path() {
        let err = load_string("does-not-exist.obj").await.unwrap_err();
        assert!(format!("{err:#}").contains("does-not-exist.obj"));
    }
}
