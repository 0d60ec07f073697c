use approx::{assert_abs_diff_eq, assert_relative_eq};
use tubecompare::algorithms::ellipse::envelope_with_ceiling;
use tubecompare::algorithms::rectangle::{remove_backward_loops, remove_backward_loops_within, LoopRemoval};
use tubecompare::algorithms::{compute, Algorithm, Side};
use tubecompare::calibrate::{calibrate, interpolate};
use tubecompare::compare::compare_curves;
use tubecompare::config::CompareOptions;
use tubecompare::curve::Curve;
use tubecompare::report::{ErrorStep, Validity};
use tubecompare::tube_size::{Axis, BasePolicy, Relativity, TubeSize};
use tubecompare::validate::{compare, validate_report};
use tubecompare::TubeError;

fn assert_points(curve: &Curve, expected: &[(f64, f64)]) {
    assert_eq!(curve.len(), expected.len(), "{}: {:?}", curve.name(), curve);
    for ((x, y), (ex, ey)) in curve.points().zip(expected.iter().copied()) {
        assert_abs_diff_eq!(x, ex, epsilon = 1e-9);
        assert_abs_diff_eq!(y, ey, epsilon = 1e-9);
    }
}

fn absolute(w: f64, h: f64) -> TubeSize {
    let mut size = TubeSize::from_bases(1.0, 1.0, 1.0);
    assert!(size.calculate_from_two(w, h, Relativity::Absolute).unwrap());
    size
}

fn absolute_options(w: f64, h: f64, algorithm: Algorithm) -> CompareOptions {
    CompareOptions {
        value: w,
        value_y: Some(h),
        relativity: Relativity::Absolute,
        algorithm,
        ..CompareOptions::default()
    }
}

fn peak() -> Curve {
    Curve::new("peak", vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 0.0])
}

#[test]
fn curve_truncates_to_shorter_input() {
    let c = Curve::new("c", vec![0.0, 1.0, 2.0, 3.0], vec![5.0, 6.0]);
    assert_eq!(c.x(), &[0.0, 1.0]);
    assert_eq!(c.y(), &[5.0, 6.0]);
    assert!(c.is_valid());
    assert!(!Curve::new("e", vec![1.0], vec![]).is_valid());
    assert!(!Curve::new("b", vec![1.0, 0.0], vec![0.0, 0.0]).is_monotone_in_x());
}

#[test]
fn size_from_one_relative_on_x() {
    let mut size = TubeSize::from_bases(10.0, 20.0, 2.0);
    assert!(size.calculate_from_one(0.5, Axis::X, Relativity::Relative).unwrap());
    assert_relative_eq!(size.half_width, 5.0);
    assert_relative_eq!(size.half_height, 10.0);
}

#[test]
fn size_fails_softly_without_ratio() {
    let mut size = TubeSize::from_bases(10.0, 20.0, 0.0);
    assert!(!size.calculate_from_one(0.5, Axis::X, Relativity::Relative).unwrap());
    assert!(!size.is_valid());
    assert!(matches!(size.failure(), TubeError::TubeSize { .. }));
}

#[test]
fn range_is_checked_before_ratio() {
    let mut size = TubeSize::from_bases(10.0, 20.0, 0.0);
    let out = size.calculate_from_one(1.5, Axis::X, Relativity::Relative);
    assert!(matches!(out, Err(TubeError::OutOfRange { .. })));
}

#[test]
fn absolute_size_refuses_negative_or_nan() {
    let mut size = TubeSize::from_bases(1.0, 1.0, 1.0);
    assert!(!size.calculate_from_two(-0.1, 0.1, Relativity::Absolute).unwrap());
    assert!(!size.calculate_from_two(0.1, f64::NAN, Relativity::Absolute).unwrap());
    assert!(!size.is_valid());
    assert!(size.calculate_from_two(0.0, 0.3, Relativity::Absolute).unwrap());
    assert!(size.is_valid());
}

#[test]
fn bases_follow_policy() {
    let c = Curve::new("c", vec![2.0, 3.0, 4.0], vec![5.0, 5.0, 5.0]);
    let standard = TubeSize::new(&c, 0.001, BasePolicy::Standard);
    assert_relative_eq!(standard.base_x, 2.0);
    assert_relative_eq!(standard.base_y, 0.001);
    assert_relative_eq!(standard.ratio, 0.0005);

    let legacy = TubeSize::new(&c, 0.001, BasePolicy::Legacy);
    assert_relative_eq!(legacy.base_x, 2.0);
    assert_relative_eq!(legacy.base_y, 5.0);

    let single = Curve::new("s", vec![4.0], vec![1.0]);
    assert_relative_eq!(TubeSize::new(&single, 0.001, BasePolicy::Standard).base_x, 4.0);
    let origin = Curve::new("o", vec![0.0], vec![1.0]);
    assert_relative_eq!(TubeSize::new(&origin, 0.001, BasePolicy::Standard).base_x, 1.0);
}

#[test]
fn rectangle_peak() {
    let env = Algorithm::Rectangle.envelope(&peak(), &absolute(0.1, 0.1)).unwrap();
    assert_points(&env.upper, &[(-0.1, 0.1), (0.9, 1.1), (1.1, 1.1), (2.1, 0.1)]);
    assert_points(&env.lower, &[(-0.1, -0.1), (0.1, -0.1), (1.0, 0.8), (1.9, -0.1), (2.1, -0.3)]);
    assert!(env.lower.x().windows(2).all(|w| w[0] < w[1]));
    assert!(env.upper.x().windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn rectangle_zigzag() {
    let reference = Curve::new("z", vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0, 0.0, 1.0]);
    let env = Algorithm::Rectangle.envelope(&reference, &absolute(0.1, 0.1)).unwrap();
    assert_points(&env.upper, &[(-0.1, 0.1), (0.9, 1.1), (1.1, 1.1), (2.0, 0.2), (2.9, 1.1), (3.1, 1.3)]);
    assert_points(&env.lower, &[(-0.1, -0.1), (0.1, -0.1), (1.0, 0.8), (1.9, -0.1), (2.1, -0.1), (3.1, 0.9)]);
}

#[test]
fn loop_removal_cuts_at_intersection() {
    let mut x = vec![-0.1, 0.1, 1.1, 0.9, 1.9, 2.1];
    let mut y = vec![-0.1, -0.1, 0.9, 0.9, -0.1, -0.3];
    let removal = remove_backward_loops(&mut x, &mut y, Side::Lower);
    assert_eq!(removal.loops, 1);
    assert!(!removal.exhausted);
    assert_points(
        &Curve::new("Lower", x.clone(), y.clone()),
        &[(-0.1, -0.1), (0.1, -0.1), (1.0, 0.8), (1.9, -0.1), (2.1, -0.3)],
    );
    assert_eq!(remove_backward_loops(&mut x, &mut y, Side::Lower).loops, 0);
}

#[test]
fn loop_removal_stops_at_ceiling() {
    let mut x = vec![-0.1, 0.1, 1.1, 0.9, 1.9, 2.1];
    let mut y = vec![-0.1, -0.1, 0.9, 0.9, -0.1, -0.3];
    let (x0, y0) = (x.clone(), y.clone());
    let removal = remove_backward_loops_within(&mut x, &mut y, Side::Lower, 0);
    assert!(removal.exhausted);
    assert_eq!(removal.loops, 0);
    assert_eq!(x, x0);
    assert_eq!(y, y0);

    let removal = remove_backward_loops_within(&mut x, &mut y, Side::Lower, 1);
    assert_eq!(removal, LoopRemoval { loops: 1, exhausted: false });
    assert!(x.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn rectangle_rejects_single_point() {
    let c = Curve::new("one", vec![1.0], vec![1.0]);
    let err = Algorithm::Rectangle.envelope(&c, &absolute(0.1, 0.1)).unwrap_err();
    assert_eq!(err.step(), ErrorStep::Tube);
}

#[test]
fn ellipse_ramp_is_a_shifted_line() {
    let x: Vec<f64> = (0..=10).map(f64::from).collect();
    let reference = Curve::new("ramp", x.clone(), x);
    let env = Algorithm::Ellipse.envelope(&reference, &absolute(0.1, 0.1)).unwrap();
    let off = 0.1 * 2f64.sqrt();
    assert_points(&env.upper, &[(-0.1, -0.1 + off), (10.1, 10.1 + off)]);
    assert_points(&env.lower, &[(-0.1, -0.1 - off), (10.1, 10.1 - off)]);
}

#[test]
fn ellipse_peak() {
    let env = Algorithm::Ellipse.envelope(&peak(), &absolute(0.1, 0.1)).unwrap();
    let r = 0.1 * 1.25f64.sqrt();
    assert_points(&env.upper, &[(-0.1, r - 0.1), (1.0, 1.0 + r), (2.1, r - 0.1)]);
    assert_points(&env.lower, &[(-0.1, -0.1 - r), (1.0, 1.0 - r), (2.1, -0.1 - r)]);
}

#[test]
fn ellipse_depends_only_on_half_width() {
    let flat = Algorithm::Ellipse.envelope(&peak(), &absolute(0.1, 0.1)).unwrap();
    let tall = Algorithm::Ellipse.envelope(&peak(), &absolute(0.1, 5.0)).unwrap();
    assert_eq!(flat, tall);
}

#[test]
fn ellipse_jump_has_horizontal_offset() {
    let reference = Curve::new("jump", vec![0.0, 0.0, 1.0], vec![0.0, 5.0, 5.0]);
    let env = Algorithm::Ellipse.envelope(&reference, &absolute(0.1, 0.1)).unwrap();
    for (x, y) in env.upper.points().chain(env.lower.points()) {
        assert!(x.is_finite() && y.is_finite());
    }
    assert_eq!(env.upper.y()[0], 0.5);
    assert_eq!(env.upper.y()[1], 0.5);
    assert!(env.upper.x()[0] < env.upper.x()[1]);
    assert_eq!(env.lower.y()[0], -0.5);
    assert_eq!(env.lower.y()[1], -0.5);

    let mut report = compute(Algorithm::Ellipse, &reference, &absolute(0.1, 0.1)).unwrap();
    validate_report(&mut report, &reference).unwrap();
    assert_eq!(report.validity, Validity::Valid);
}

#[test]
fn ellipse_step_encloses_reference() {
    let reference = Curve::new("step", vec![0.0, 1.0, 1.0, 2.0], vec![0.0, 0.0, 1.0, 1.0]);
    let report = compare_curves(reference.clone(), Some(reference), &absolute_options(0.1, 0.1, Algorithm::Ellipse)).unwrap();
    assert_eq!(report.error_step, ErrorStep::None);
    assert_eq!(report.validity, Validity::Valid);
    assert_eq!(report.error_count(), 0);
}

#[test]
fn ellipse_fold_ceiling_still_returns_boundaries() {
    // the lower junction after the third point lands behind the second
    let reference = Curve::new("hook", vec![0.0, 1.0, 2.0, 3.0, 3.5], vec![0.0, 8.0, 9.0, 6.0, 6.0]);

    let capped = envelope_with_ceiling(&reference, 1.0, 0).unwrap();
    for (x, y) in capped.upper.points().chain(capped.lower.points()) {
        assert!(x.is_finite() && y.is_finite());
    }
    assert_eq!(capped.lower.len(), 5);
    assert!(!capped.lower.is_monotone_in_x());
    assert!(capped.upper.is_monotone_in_x());

    let folded = Algorithm::Ellipse.envelope(&reference, &absolute(1.0, 1.0)).unwrap();
    assert_eq!(folded.lower.len(), 4);
    assert!(folded.lower.is_monotone_in_x());
    assert!(folded.upper.is_monotone_in_x());
    assert_abs_diff_eq!(folded.lower.x()[2], capped.lower.x()[3], epsilon = 1e-12);
    assert_eq!(folded.upper.x(), capped.upper.x());
}

#[test]
fn calibrate_keeps_only_covered_targets() {
    let c = Curve::new("c", vec![0.0, 1.0, 2.0], vec![0.0, 10.0, 20.0]);
    let out = calibrate(&c, &[0.5, 1.0, 1.5, 2.5]);
    assert_eq!(out.x(), &[0.5, 1.0, 1.5]);
    assert_eq!(out.y(), &[5.0, 10.0, 15.0]);
    assert!(interpolate(&[], &[], &[1.0]).is_empty());
    assert_eq!(interpolate(&[1.0, 1.0, 2.0], &[3.0, 4.0, 5.0], &[1.0]), vec![3.0]);
}

#[test]
fn compare_reports_deviation_magnitudes() {
    let cmp = compare(&[0.0, 0.0, 0.0], &[1.0, 1.0, 1.0], &[0.5, 3.0, -2.0], &[0.0, 1.0, 2.0]);
    assert_eq!(cmp.error_count, 2);
    assert_eq!(cmp.errors.x(), &[1.0, 2.0]);
    assert_eq!(cmp.errors.y(), &[2.0, 2.0]);
    assert_eq!(cmp.deviations, vec![0.0, 2.0, 2.0]);
    // only interior samples carry weight
    assert_relative_eq!(cmp.delta_error, 2.0 / (1e-3 + 3.0));
}

#[test]
fn identical_curve_is_valid() {
    for algorithm in [Algorithm::Rectangle, Algorithm::Ellipse] {
        let report = compare_curves(peak(), Some(peak()), &absolute_options(0.1, 0.1, algorithm)).unwrap();
        assert_eq!(report.validity, Validity::Valid, "{algorithm}");
        assert_eq!(report.error_step, ErrorStep::None);
        assert_eq!(report.delta_error, 0.0);
    }
}

#[test]
fn identical_curve_is_valid_with_default_tolerance() {
    let x: Vec<f64> = (0..200).map(|i| i as f64 * 0.05).collect();
    let y: Vec<f64> = x.iter().map(|t| t.sin()).collect();
    let reference = Curve::new("sin", x, y);
    for algorithm in [Algorithm::Rectangle, Algorithm::Ellipse] {
        let options = CompareOptions { algorithm, ..CompareOptions::default() };
        let report = compare_curves(reference.clone(), Some(reference.clone()), &options).unwrap();
        assert_eq!(report.validity, Validity::Valid, "{algorithm}");
    }
}

#[test]
fn out_of_tube_sample_is_invalid() {
    let test = Curve::new("peak", vec![0.0, 1.0, 2.0], vec![0.0, 1.5, 0.0]);
    let report = compare_curves(peak(), Some(test), &absolute_options(0.1, 0.1, Algorithm::Rectangle)).unwrap();
    assert_eq!(report.validity, Validity::Invalid);
    assert_eq!(report.errors.x(), &[1.0]);
    assert_relative_eq!(report.errors.y()[0], 0.4, max_relative = 1e-9);
    assert_relative_eq!(report.delta_error, 0.4 / 1.501, max_relative = 1e-9);
}

#[test]
fn missing_test_curve_keeps_tube() {
    let report = compare_curves(peak(), None, &CompareOptions::default()).unwrap();
    assert_eq!(report.error_step, ErrorStep::Validation);
    assert_eq!(report.validity, Validity::Undefined);
    assert!(report.lower.is_valid() && report.upper.is_valid());
}

#[test]
fn stage_failures_are_recorded() {
    let empty = compare_curves(Curve::empty("e"), None, &CompareOptions::default()).unwrap();
    assert_eq!(empty.error_step, ErrorStep::DataImport);

    let single = Curve::new("one", vec![1.0], vec![1.0]);
    let degenerate = compare_curves(single.clone(), Some(single), &CompareOptions::default()).unwrap();
    assert_eq!(degenerate.error_step, ErrorStep::Tube);
    assert_eq!(degenerate.validity, Validity::Undefined);

    let late = Curve::new("peak", vec![10.0, 11.0], vec![0.0, 0.0]);
    let disjoint = compare_curves(peak(), Some(late), &CompareOptions::default()).unwrap();
    assert_eq!(disjoint.error_step, ErrorStep::Validation);
    assert_eq!(disjoint.validity, Validity::Undefined);
}

#[test]
fn test_curve_without_data_is_an_import_failure() {
    let blank = Curve::new("peak", vec![0.0, 1.0, 2.0], vec![]);
    let report = compare_curves(peak(), Some(blank), &CompareOptions::default()).unwrap();
    assert_eq!(report.error_step, ErrorStep::DataImport);
    assert_eq!(report.validity, Validity::Undefined);
    assert!(report.upper.is_valid());
    assert!(report.lower.is_valid());
}

#[test]
fn relative_value_out_of_range_propagates() {
    let options = CompareOptions { value: 1.5, ..CompareOptions::default() };
    let err = compare_curves(peak(), Some(peak()), &options).unwrap_err();
    assert!(matches!(err, TubeError::OutOfRange { .. }));
}
