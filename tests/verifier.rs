//! Integration tests for the reference verifier

mod common;

use common::{f32_ulps_up, init_logging};
use simt_spmm::error::Error;
use simt_spmm::kernel::{GridDim, spmm_csr_grid};
use simt_spmm::sparse::SpmmProblem;
use simt_spmm::verify::{Comparator, MAX_REPORTED_ERRORS, Verifier, spmm_reference};

#[test]
fn test_single_element_perturbation_boundary() {
    init_logging();
    let problem = SpmmProblem::<f32>::generate(8, 8, 8, 0.5, 50).unwrap();
    let expected = spmm_reference(&problem.a, &problem.b, 8).unwrap();
    // Pick a strictly positive cell so moving up by ULPs is well defined
    let idx = expected.iter().position(|&v| v > 0.0).unwrap();
    let verifier = Verifier::for_element::<f32>();

    let mut six = expected.clone();
    six[idx] = f32_ulps_up(six[idx], 6);
    assert!(verifier.verify(&six, &expected).unwrap().passed());

    let mut seven = expected.clone();
    seven[idx] = f32_ulps_up(seven[idx], 7);
    let report = verifier.verify(&seven, &expected).unwrap();
    assert_eq!(report.errors, 1);
    assert_eq!(report.mismatches[0].index, idx);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn test_integer_results_have_zero_tolerance() {
    let problem = SpmmProblem::<i32>::generate(6, 5, 4, 0.2, 50).unwrap();
    let expected = spmm_reference(&problem.a, &problem.b, 5).unwrap();
    let verifier = Verifier::for_element::<i32>();
    assert_eq!(verifier.comparator(), Comparator::Exact);

    let mut off_by_one = expected.clone();
    off_by_one[3] += 1;
    let report = verifier.verify(&off_by_one, &expected).unwrap();
    assert_eq!(report.errors, 1);
    assert!(!report.passed());
}

#[test]
fn test_verification_is_idempotent() {
    let problem = SpmmProblem::<f32>::generate(16, 12, 10, 0.7, 50).unwrap();
    let (c, _) = spmm_csr_grid(&problem.a, &problem.b, 12, GridDim::planar(12, 16)).unwrap();

    let first = {
        let expected = spmm_reference(&problem.a, &problem.b, 12).unwrap();
        Verifier::for_element::<f32>().verify(&c, &expected).unwrap()
    };
    let second = {
        let expected = spmm_reference(&problem.a, &problem.b, 12).unwrap();
        Verifier::for_element::<f32>().verify(&c, &expected).unwrap()
    };
    assert_eq!(first, second);
    assert!(first.passed());
}

#[test]
fn test_report_is_capped_but_count_is_not() {
    let expected = vec![1.0f32; 250];
    let actual = vec![2.0f32; 250];
    let report = Verifier::for_element::<f32>().verify(&actual, &expected).unwrap();
    assert_eq!(report.errors, 250);
    assert_eq!(report.mismatches.len(), MAX_REPORTED_ERRORS);
    assert_eq!(report.exit_code(), 250);
    assert_eq!(report.mismatches.last().unwrap().index, MAX_REPORTED_ERRORS - 1);
}

#[test]
fn test_nan_never_matches() {
    let report = Verifier::for_element::<f32>()
        .verify(&[f32::NAN, 0.0], &[f32::NAN, -0.0])
        .unwrap();
    assert_eq!(report.errors, 1);
    assert_eq!(report.mismatches[0].index, 0);
}

#[test]
fn test_custom_tolerance() {
    let verifier = Verifier::new(Comparator::Ulp { max_ulps: 0 });
    let report = verifier.verify(&[f32_ulps_up(1.0, 1)], &[1.0]).unwrap();
    assert_eq!(report.errors, 1);
}

#[test]
fn test_length_mismatch() {
    assert!(matches!(
        Verifier::for_element::<i32>().verify(&[1, 2], &[1]),
        Err(Error::ShapeMismatch { .. })
    ));
}
