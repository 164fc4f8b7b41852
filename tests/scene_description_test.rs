use cgmath::Vector3;
use parallax_ngin::{
    camera::{ASPECT_RATIO, Camera},
    pipelines::TechniqueKind,
    scene::description::{SceneDescription, TextureSource},
};

mod common;

#[test]
fn demo_scene_places_camera_behind_the_cubes() {
    let description = SceneDescription::default();
    assert_eq!(description.camera.position, Vector3::new(40.0, 30.0, -90.0));
    let cube = &description.entities[description.entity_index("Cube").unwrap()];
    assert_eq!(cube.technique, TechniqueKind::ParallaxMapping);
    assert!(cube.tangents);
    assert!(cube.controls.is_some());
}

#[test]
fn only_the_portal_shows_the_portal_texture() {
    let description = SceneDescription::default();
    let portal_entities: Vec<_> = description
        .entities
        .iter()
        .filter(|e| e.diffuse == TextureSource::Portal)
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(portal_entities, vec!["Portal"]);
}

#[test]
fn light_models_are_drawn_additively() {
    let description = SceneDescription::default();
    for light in &description.lights {
        if let Some(model) = &light.model {
            let index = description.entity_index(model).unwrap();
            let entity = &description.entities[index];
            assert_eq!(entity.technique, TechniqueKind::AdditiveTintTex);
            assert!(!entity.casts_shadow);
        }
    }
}

#[test]
fn bare_scene_needs_no_assets() {
    let description = common::test_utils::bare_scene(wgpu::Color::BLACK);
    description.validate().unwrap();
    assert!(description.mesh_files().is_empty());
    assert!(description.texture_files().is_empty());
}

#[test]
fn camera_uses_fixed_aspect_ratio() {
    let camera = Camera::default();
    let projection = camera.projection_matrix();
    assert!((projection.y.y / projection.x.x - ASPECT_RATIO).abs() < 1e-5);
}
