use neurochain_core::{
    AdaptationStrategy, Component, GradientDescent, Matrix, SoftMaxUnit, Vector, VectorBatch,
    WeightsMatrix,
};
use proptest::prelude::*;

fn values(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0e3f64..1.0e3, len)
}

/// Any vector shape: dense, zero, basis or a composite of dense and zero parts.
fn any_vector(len: usize) -> impl Strategy<Value = Vector> {
    prop_oneof![
        values(len).prop_map(Vector::from_vec),
        Just(Vector::zeros(len)),
        (0..len, -1.0e3f64..1.0e3).prop_map(move |(i, v)| Vector::basis(len, i, v).unwrap()),
        (0..=len, values(len)).prop_map(move |(split, data)| {
            Vector::composite(vec![
                Vector::from_vec(data[..split].to_vec()),
                Vector::zeros(len - split),
            ])
        }),
    ]
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn adding_zero_is_identity(v in any_vector(6)) {
        prop_assert_eq!(v.add(&Vector::zeros(6)).unwrap(), v.clone());
        prop_assert_eq!(Vector::zeros(6).add(&v).unwrap(), v);
    }

    #[test]
    fn scaling_by_one_is_identity(v in any_vector(6)) {
        prop_assert_eq!(v.scale(1.0), v);
    }

    #[test]
    fn adding_the_negation_gives_zero(v in any_vector(6)) {
        prop_assert_eq!(v.add(&v.scale(-1.0)).unwrap(), Vector::zeros(6));
    }

    #[test]
    fn basis_at_same_index_sums_values(
        a in -1.0e3f64..1.0e3,
        b in -1.0e3f64..1.0e3,
        i in 0usize..8,
    ) {
        let sum = Vector::basis(8, i, a).unwrap().add(&Vector::basis(8, i, b).unwrap()).unwrap();
        prop_assert_eq!(sum, Vector::basis(8, i, a + b).unwrap());
    }

    #[test]
    fn sparse_addition_agrees_with_dense(a in any_vector(5), b in any_vector(5)) {
        let sparse = a.add(&b).unwrap();
        let dense = a.to_full().add(&b.to_full()).unwrap();
        prop_assert_eq!(sparse, dense);
        prop_assert_eq!(a.add(&b).unwrap(), b.add(&a).unwrap());
    }

    #[test]
    fn matrix_scale_round_trips(
        data in values(6),
        s in prop_oneof![-10.0f64..-0.1, 0.1f64..10.0],
    ) {
        let m = Matrix::from_shape_vec(2, 3, data).unwrap();
        let back = m.scale(s).scale(1.0 / s);
        for (x, y) in back.as_array().iter().zip(m.as_array().iter()) {
            prop_assert!(close(*x, *y), "{} vs {}", x, y);
        }
    }

    #[test]
    fn softmax_rows_are_distributions_and_shift_invariant(
        row in prop::collection::vec(-50.0f64..50.0, 4),
        shift in -100.0f64..100.0,
    ) {
        let mut unit = SoftMaxUnit::new(4);
        let base = unit.run(&VectorBatch::from_rows(&[row.clone()]).unwrap()).unwrap();
        let shifted_row: Vec<f64> = row.iter().map(|x| x + shift).collect();
        let shifted = unit.run(&VectorBatch::from_rows(&[shifted_row]).unwrap()).unwrap();

        prop_assert!((base.row(0).unwrap().sum() - 1.0).abs() < 1e-12);
        prop_assert!(base.approx_eq(&shifted, 1e-9));
    }

    #[test]
    fn gradient_descent_delta(
        p in values(3),
        g in values(3),
        step in 0.001f64..1.0,
        batch in 1usize..32,
    ) {
        let params = WeightsMatrix::from_rows(&[p.clone()]).unwrap();
        let gradient = WeightsMatrix::from_rows(&[g.clone()]).unwrap();
        let delta = GradientDescent::new(step).unwrap().weights_update(&gradient, batch);
        let updated = params.add(&delta).unwrap();

        for i in 0..3 {
            let expected = p[i] - (step / batch as f64) * g[i];
            prop_assert!(close(updated.get(0, i).unwrap(), expected));
        }
    }
}
