//! End-to-end conversion properties: ordering, partial failure, and the
//! upload-to-display path.

#![allow(clippy::unwrap_used, clippy::panic, clippy::float_cmp)]

use std::cell::Cell;
use std::io::Cursor;

use futures::executor::block_on;
use graystep_pipeline::{
    AlgorithmExecutor, AlgorithmStep, AxisConfig, ConversionPipeline, ConversionSession,
    ExecutionError, Image, NativeExecutor, NoPacing, PipelineError, SampleViewMut, SessionState,
    StepKind, StepOutcome, StepParams, to_grid,
};

/// Delegates to [`NativeExecutor`] but fails on the call with index `fail_at`.
struct FailsAt {
    fail_at: usize,
    calls: Cell<usize>,
}

impl FailsAt {
    const fn new(fail_at: usize) -> Self {
        Self {
            fail_at,
            calls: Cell::new(0),
        }
    }

    fn tick(&self) -> Result<(), ExecutionError> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if call == self.fail_at {
            Err(ExecutionError::InvalidParameter("injected".to_owned()))
        } else {
            Ok(())
        }
    }
}

impl AlgorithmExecutor for FailsAt {
    fn hot_pixel_removal(
        &self,
        image: &mut SampleViewMut<'_>,
        low: f32,
        high: f32,
    ) -> Result<(), ExecutionError> {
        self.tick()?;
        NativeExecutor.hot_pixel_removal(image, low, high)
    }

    fn gaussian_blur(
        &self,
        image: &mut SampleViewMut<'_>,
        sigma: f32,
    ) -> Result<(), ExecutionError> {
        self.tick()?;
        NativeExecutor.gaussian_blur(image, sigma)
    }

    fn median_blur(
        &self,
        image: &mut SampleViewMut<'_>,
        radius: u32,
    ) -> Result<(), ExecutionError> {
        self.tick()?;
        NativeExecutor.median_blur(image, radius)
    }

    fn linear_transform(
        &self,
        image: &mut SampleViewMut<'_>,
        a: f32,
        b: f32,
    ) -> Result<(), ExecutionError> {
        self.tick()?;
        NativeExecutor.linear_transform(image, a, b)
    }
}

fn step(params: StepParams) -> AlgorithmStep {
    AlgorithmStep {
        enabled: true,
        params,
    }
}

/// 8x8 gradient with a bright block, enough structure for blurs to bite.
fn test_image() -> Image {
    let samples = (0..64u8)
        .map(|i| if (18..22).contains(&i) { 200 } else { i * 2 })
        .collect();
    Image::from_u8(8, 8, samples).unwrap()
}

fn run_native(image: &mut Image, steps: &[AlgorithmStep]) {
    let pipeline = ConversionPipeline::new(NativeExecutor, NoPacing);
    block_on(pipeline.run(image, steps, |_| {})).unwrap();
}

#[test]
fn reordering_non_commuting_steps_changes_output() {
    let blur = step(StepParams::GaussianBlur { sigma: 1.5 });
    let linear = step(StepParams::LinearTransform { a: 3.0, b: -40.0 });

    let mut blur_first = test_image();
    run_native(&mut blur_first, &[blur, linear]);

    let mut linear_first = test_image();
    run_native(&mut linear_first, &[linear, blur]);

    assert_ne!(blur_first, linear_first);
}

#[test]
fn failure_at_step_k_keeps_prefix_result() {
    let steps = [
        step(StepParams::LinearTransform { a: 1.0, b: 7.0 }),
        step(StepParams::MedianBlur { kernel_radius: 1 }),
        step(StepParams::GaussianBlur { sigma: 1.0 }),
        step(StepParams::LinearTransform { a: 2.0, b: 0.0 }),
    ];

    for k in 0..steps.len() {
        let mut expected = test_image();
        if k > 0 {
            run_native(&mut expected, &steps[..k]);
        }

        let mut image = test_image();
        let pipeline = ConversionPipeline::new(FailsAt::new(k), NoPacing);
        let failure = block_on(pipeline.run(&mut image, &steps, |_| {})).unwrap_err();

        match failure.error {
            PipelineError::ExecutionFailure {
                step_index,
                step_kind,
                ..
            } => {
                assert_eq!(step_index, k);
                assert_eq!(step_kind, steps[k].kind());
            }
            other => panic!("expected ExecutionFailure, got {other:?}"),
        }
        assert_eq!(image, expected, "buffer after failure at step {k}");

        let outcomes = &failure.report.steps;
        assert!(
            outcomes[..k]
                .iter()
                .all(|r| matches!(r.outcome, StepOutcome::Succeeded { .. }))
        );
        assert!(matches!(outcomes[k].outcome, StepOutcome::Failed { .. }));
        assert!(
            outcomes[k + 1..]
                .iter()
                .all(|r| r.outcome == StepOutcome::NotAttempted)
        );
    }
}

#[test]
fn no_enabled_steps_never_mutates() {
    let mut disabled = step(StepParams::LinearTransform { a: 0.0, b: 0.0 });
    disabled.enabled = false;

    for steps in [Vec::new(), vec![disabled]] {
        let mut image = test_image();
        let pipeline = ConversionPipeline::new(NativeExecutor, NoPacing);
        let mut events = 0;
        let failure = block_on(pipeline.run(&mut image, &steps, |_| events += 1)).unwrap_err();

        assert!(matches!(failure.error, PipelineError::NoStepsSelected));
        assert_eq!(image, test_image());
        assert_eq!(events, 0);
    }
}

#[test]
fn mid_gray_linear_transform_end_to_end() {
    let gray = image::GrayImage::from_pixel(4, 4, image::Luma([128]));
    let mut png = Cursor::new(Vec::new());
    image::DynamicImage::ImageLuma8(gray)
        .write_to(&mut png, image::ImageFormat::Png)
        .unwrap();

    let mut session = ConversionSession::new();
    session.load(png.into_inner(), "image/png").unwrap();

    let steps = [step(StepParams::LinearTransform { a: 2.0, b: 10.0 })];
    let mut lease = session.begin_run(&steps).unwrap();
    let pipeline = ConversionPipeline::new(NativeExecutor, NoPacing);
    let mut percents = Vec::new();
    let outcome = block_on(pipeline.run(lease.image_mut(), &steps, |e| percents.push(e.percent)))
        .map(graystep_pipeline::ConvertedSamples::into_report);
    session.finish_run(lease, outcome);

    assert_eq!(percents, [0, 100]);
    assert_eq!(session.state(), SessionState::Converted);
    let converted = session.converted().unwrap();
    assert!(converted.as_u8().unwrap().iter().all(|&v| v == 255));

    // Both previews publish the same aspect ratio.
    let mut aspects = Vec::new();
    let original = to_grid(session.original().as_ref(), &AxisConfig::default(), |a| {
        aspects.push(a);
    });
    let result = to_grid(Some(&converted), &AxisConfig::default(), |a| aspects.push(a));
    assert_eq!(aspects, [1.0, 1.0]);
    assert_eq!(original.z_range.min, 127.0);
    assert_eq!(result.z_range.max, 256.0);
}

#[test]
fn sixteen_bit_images_stay_sixteen_bit() {
    let samples: Vec<u16> = (0..36).map(|i| i * 1500).collect();
    let mut image = Image::from_u16(6, 6, samples).unwrap();
    let steps: Vec<AlgorithmStep> = StepKind::ALL
        .into_iter()
        .map(AlgorithmStep::create_default)
        .collect();

    let pipeline = ConversionPipeline::new(NativeExecutor, NoPacing);
    let converted = block_on(pipeline.run(&mut image, &steps, |_| {})).unwrap();

    let out = converted.samples.as_u16().unwrap();
    assert_eq!(out.len(), 36);
    assert!(out.iter().any(|&v| v > 255));
}

#[test]
fn corrected_list_can_run_after_failure() {
    let mut image = test_image();
    let pipeline = ConversionPipeline::new(FailsAt::new(0), NoPacing);
    let steps = [step(StepParams::LinearTransform { a: 1.0, b: 1.0 })];
    assert!(block_on(pipeline.run(&mut image, &steps, |_| {})).is_err());

    // The executor only fails once; the same pipeline accepts the next run.
    let converted = block_on(pipeline.run(&mut image, &steps, |_| {})).unwrap();
    assert_eq!(converted.report.succeeded(), 1);
}
