use glam::{Vec2, Vec4};
use licflow::field::encode;
use licflow::{
    drive, CpuFlowPipeline, FixedOffsetSource, FlowInputs, FrameRenderer, PipelineSettings,
    Resolution, SeededOffsetSource, Texture, UniformBindings, VectorField,
};

const RES: Resolution = Resolution {
    width: 32,
    height: 16,
};

fn checker_noise() -> Texture {
    Texture::from_fn(RES, |x, y| {
        let value = if (x / 2 + y / 2) % 2 == 0 { 0.8 } else { 0.2 };
        Vec4::new(value, value, value, 1.0)
    })
}

fn max_difference(a: &Texture, b: &Texture) -> f32 {
    a.texels()
        .iter()
        .zip(b.texels())
        .map(|(a, b)| (*a - *b).abs().max_element())
        .fold(0.0, f32::max)
}

#[test]
fn still_water_is_an_identity_animation() {
    let settings = PipelineSettings::with_resolution(RES.width, RES.height);
    let field = VectorField::uniform(RES, Vec2::ZERO);
    let earth = Texture::filled(Resolution::new(4, 2), Vec4::new(0.1, 0.3, 0.1, 1.0));
    let noise = checker_noise();
    let mut pipeline =
        CpuFlowPipeline::new(settings, FlowInputs::new(field, noise.clone(), Some(earth)))
            .unwrap();

    let mut bindings = UniformBindings::new();
    let mut offsets = FixedOffsetSource::new(Vec2::ZERO);
    let stats = drive(&mut pipeline, &mut offsets, &mut bindings, 5).unwrap();
    assert_eq!(stats.len(), 5);

    assert!(max_difference(pipeline.transported(), &noise) < 1e-6);
    assert!(max_difference(pipeline.lic(), &noise) < 1e-6);
    assert!(max_difference(pipeline.advected(), &noise) < 1e-6);
    assert!(max_difference(pipeline.blended(), &noise) < 1e-5);

    // No motion means the default mask hides every water texel.
    let globe = pipeline.globe_map(&bindings);
    assert!(globe.texels().iter().all(|texel| *texel == Vec4::ZERO));
}

#[test]
fn land_keeps_the_initial_frame_forever() {
    let settings = PipelineSettings::with_resolution(RES.width, RES.height);
    let field = VectorField::from_fn(RES, |_, _| None);
    let noise = checker_noise();
    let mut pipeline =
        CpuFlowPipeline::new(settings, FlowInputs::new(field, noise.clone(), None)).unwrap();

    let mut bindings = UniformBindings::new();
    let mut offsets = SeededOffsetSource::new(11);
    drive(&mut pipeline, &mut offsets, &mut bindings, 4).unwrap();

    // Blending equal inputs returns the same value up to rounding.
    assert!(max_difference(pipeline.blended(), &noise) < 1e-5);
    assert!(max_difference(pipeline.transported(), &noise) < 1e-6);
}

#[test]
fn globe_map_shows_earth_over_land_only() {
    let settings = PipelineSettings::with_resolution(RES.width, RES.height);
    let field =
        VectorField::from_fn(RES, |x, _| (x >= RES.width / 2).then_some(Vec2::new(0.4, 0.0)));
    let green = Vec4::new(0.3, 0.5, 0.2, 1.0);
    let earth = Texture::filled(Resolution::new(1, 1), green);
    let mut pipeline =
        CpuFlowPipeline::new(settings, FlowInputs::new(field, checker_noise(), Some(earth)))
            .unwrap();
    let bindings = UniformBindings::new();
    pipeline.render_frame(&bindings).unwrap();

    let globe = pipeline.globe_map(&bindings);
    assert!((globe.texel(0, 5) - green).abs().max_element() < 1e-6);
    let water = globe.texel(RES.width - 2, 5);
    assert!((water - green).abs().max_element() > 1e-3);
    assert!(water.max_element() <= 1.0 + 1e-6);
}

#[test]
fn moving_water_changes_the_picture() {
    let settings = PipelineSettings::with_resolution(RES.width, RES.height);
    let field = VectorField::uniform(RES, Vec2::new(0.3, 0.1));
    let noise = checker_noise();
    let mut pipeline =
        CpuFlowPipeline::new(settings, FlowInputs::new(field, noise.clone(), None)).unwrap();

    let mut bindings = UniformBindings::new();
    let mut offsets = SeededOffsetSource::new(3);
    drive(&mut pipeline, &mut offsets, &mut bindings, 3).unwrap();

    assert!(max_difference(pipeline.blended(), &noise) > 1e-3);
    assert_eq!(pipeline.frame_index(), 3);
}

#[test]
fn field_round_trips_through_an_image_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("field.png");
    Texture::from_fn(RES, |x, _| encode((x % 3 != 0).then_some(Vec2::new(0.25, -0.25))))
        .save(&path)
        .unwrap();

    let settings = PipelineSettings::with_resolution(RES.width, RES.height);
    let inputs = FlowInputs::load(&settings, &path, None, None, 5).unwrap();
    assert!(!inputs.field.is_water_at(inputs.field.texture().coord_of(0, 0)));
    assert!(inputs.field.is_water_at(inputs.field.texture().coord_of(1, 0)));
}
