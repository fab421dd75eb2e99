#[cfg(test)]
pub mod homomorphic_tests {
    use pvac::commit::commit_ct;
    use pvac::ctsafe as ct;
    use pvac::field::{fp_add, fp_from_u64, fp_mul, fp_neg, fp_sub, FP_ZERO};
    use pvac::keygen::keygen;
    use pvac::matrix::ubk_apply;
    use pvac::metrics::product_sums_consistent;
    use pvac::ops::{
        compact_edges, compact_layers, ct_add, ct_div_const, ct_mul, ct_neg, ct_recrypt, ct_scale,
        ct_sub, dec_value, enc_value, make_evalkey, sigma_density,
    };
    use pvac::text::{dec_text, enc_text};
    use pvac::Params;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const X: u64 = 2_016_733;
    const Y: u64 = 7_083_881;
    const Z: u64 = 13_579;

    #[test]
    fn basic_roundtrip() {
        let mut rng = StdRng::seed_from_u64(1);
        let (pk, sk) = keygen(&Params::default(), &mut rng).expect("keygen");

        let c = enc_value(&pk, &sk, 42, &mut rng);
        assert_eq!(dec_value(&pk, &sk, &c).expect("dec").lo, 42);

        let c0 = enc_value(&pk, &sk, 0, &mut rng);
        let c1 = enc_value(&pk, &sk, 1, &mut rng);
        assert_eq!(dec_value(&pk, &sk, &c0).expect("dec").lo, 0);
        assert_eq!(dec_value(&pk, &sk, &c1).expect("dec").lo, 1);

        let x = enc_value(&pk, &sk, X, &mut rng);
        assert_eq!(
            dec_value(&pk, &sk, &ct_add(&pk, &x, &c0)).expect("dec").lo,
            X
        );
        assert_eq!(
            dec_value(&pk, &sk, &ct_mul(&pk, &x, &c1, &mut rng))
                .expect("dec")
                .lo,
            X
        );
        assert_eq!(
            dec_value(&pk, &sk, &ct_mul(&pk, &x, &c0, &mut rng))
                .expect("dec")
                .lo,
            0
        );
        assert_eq!(
            dec_value(&pk, &sk, &ct_sub(&pk, &x, &x)).expect("dec").lo,
            0
        );
    }

    #[test]
    fn add_sub_mul() {
        let mut rng = StdRng::seed_from_u64(2);
        let (pk, sk) = keygen(&Params::default(), &mut rng).expect("keygen");

        let x = enc_value(&pk, &sk, X, &mut rng);
        let y = enc_value(&pk, &sk, Y, &mut rng);
        let z = enc_value(&pk, &sk, Z, &mut rng);

        let s = ct_add(&pk, &x, &y);
        assert_eq!(dec_value(&pk, &sk, &s).expect("dec").lo, X + Y);

        let d = ct_sub(&pk, &x, &y);
        let expect = fp_sub(fp_from_u64(X), fp_from_u64(Y));
        assert_eq!(
            ct::fp_eq(&dec_value(&pk, &sk, &d).expect("dec"), &expect),
            1
        );

        let p = ct_mul(&pk, &x, &y, &mut rng);
        assert_eq!(dec_value(&pk, &sk, &p).expect("dec").lo, X * Y);

        let sz = ct_mul(&pk, &s, &z, &mut rng);
        assert_eq!(dec_value(&pk, &sk, &sz).expect("dec").lo, (X + Y) * Z);
    }

    #[test]
    fn modular_wrap() {
        let mut rng = StdRng::seed_from_u64(3);
        let (pk, sk) = keygen(&Params::default(), &mut rng).expect("keygen");

        let c0 = enc_value(&pk, &sk, 0, &mut rng);
        let c1 = enc_value(&pk, &sk, 1, &mut rng);

        let neg_one = ct_sub(&pk, &c0, &c1);
        let dec_neg = dec_value(&pk, &sk, &neg_one).expect("dec");
        assert_eq!(ct::fp_eq(&dec_neg, &fp_neg(fp_from_u64(1))), 1);

        let wrap = ct_add(&pk, &neg_one, &c1);
        assert_eq!(dec_value(&pk, &sk, &wrap).expect("dec").lo, 0);
    }

    #[test]
    fn algebra_identities() {
        let mut rng = StdRng::seed_from_u64(4);
        let (pk, sk) = keygen(&Params::default(), &mut rng).expect("keygen");

        let x = enc_value(&pk, &sk, X, &mut rng);
        let y = enc_value(&pk, &sk, Y, &mut rng);
        let z = enc_value(&pk, &sk, Z, &mut rng);

        let xy = dec_value(&pk, &sk, &ct_mul(&pk, &x, &y, &mut rng)).expect("dec");
        let yx = dec_value(&pk, &sk, &ct_mul(&pk, &y, &x, &mut rng)).expect("dec");
        assert_eq!(ct::fp_eq(&xy, &yx), 1);

        let a1 = ct_mul(&pk, &ct_mul(&pk, &x, &y, &mut rng), &z, &mut rng);
        let a2 = ct_mul(&pk, &x, &ct_mul(&pk, &y, &z, &mut rng), &mut rng);
        assert_eq!(
            ct::fp_eq(
                &dec_value(&pk, &sk, &a1).expect("dec"),
                &dec_value(&pk, &sk, &a2).expect("dec")
            ),
            1
        );

        let l1 = ct_mul(&pk, &x, &ct_add(&pk, &y, &z), &mut rng);
        let l2 = ct_add(
            &pk,
            &ct_mul(&pk, &x, &y, &mut rng),
            &ct_mul(&pk, &x, &z, &mut rng),
        );
        assert_eq!(
            ct::fp_eq(
                &dec_value(&pk, &sk, &l1).expect("dec"),
                &dec_value(&pk, &sk, &l2).expect("dec")
            ),
            1
        );
    }

    #[test]
    fn linear_combination() {
        let mut rng = StdRng::seed_from_u64(5);
        let (pk, sk) = keygen(&Params::default(), &mut rng).expect("keygen");

        let x = enc_value(&pk, &sk, X, &mut rng);
        let y = enc_value(&pk, &sk, Y, &mut rng);
        let z = enc_value(&pk, &sk, Z, &mut rng);

        let c3 = fp_from_u64(3);
        let c5 = fp_from_u64(5);
        let c2 = fp_from_u64(2);

        let lin = ct_sub(
            &pk,
            &ct_add(&pk, &ct_scale(&pk, &x, c3), &ct_scale(&pk, &y, c5)),
            &ct_scale(&pk, &z, c2),
        );

        let expect = fp_sub(
            fp_add(
                fp_mul(fp_from_u64(X), c3),
                fp_mul(fp_from_u64(Y), c5),
            ),
            fp_mul(fp_from_u64(Z), c2),
        );
        assert_eq!(
            ct::fp_eq(&dec_value(&pk, &sk, &lin).expect("dec"), &expect),
            1
        );
    }

    #[test]
    fn polynomial_evaluation() {
        let mut rng = StdRng::seed_from_u64(6);
        let (pk, sk) = keygen(&Params::default(), &mut rng).expect("keygen");

        // f(x) = x^3 - 2x^2 + 5x - 7 at x = 10.
        let v = 10u64;
        let cv = enc_value(&pk, &sk, v, &mut rng);
        let cv2 = ct_mul(&pk, &cv, &cv, &mut rng);
        let cv3 = ct_mul(&pk, &cv2, &cv, &mut rng);

        let poly = ct_sub(
            &pk,
            &ct_add(&pk, &cv3, &ct_scale(&pk, &cv, fp_from_u64(5))),
            &ct_add(
                &pk,
                &ct_scale(&pk, &cv2, fp_from_u64(2)),
                &enc_value(&pk, &sk, 7, &mut rng),
            ),
        );

        let expect = v * v * v - 2 * v * v + 5 * v - 7;
        assert_eq!(expect, 843);
        assert_eq!(dec_value(&pk, &sk, &poly).expect("dec").lo, expect);
    }

    #[test]
    fn quadratic_expansion() {
        let mut rng = StdRng::seed_from_u64(7);
        let (pk, sk) = keygen(&Params::default(), &mut rng).expect("keygen");

        let x = enc_value(&pk, &sk, X, &mut rng);
        let y = enc_value(&pk, &sk, Y, &mut rng);

        let s = ct_add(&pk, &x, &y);
        let sum_sq = ct_mul(&pk, &s, &s, &mut rng);

        let x2 = ct_mul(&pk, &x, &x, &mut rng);
        let y2 = ct_mul(&pk, &y, &y, &mut rng);
        let xy2 = ct_scale(&pk, &ct_mul(&pk, &x, &y, &mut rng), fp_from_u64(2));
        let expanded = ct_add(&pk, &ct_add(&pk, &x2, &xy2), &y2);

        assert_eq!(
            ct::fp_eq(
                &dec_value(&pk, &sk, &sum_sq).expect("dec"),
                &dec_value(&pk, &sk, &expanded).expect("dec")
            ),
            1
        );
    }

    #[test]
    fn repeated_multiplication_chain() {
        let mut rng = StdRng::seed_from_u64(8);
        let (pk, sk) = keygen(&Params::default(), &mut rng).expect("keygen");

        const N: u32 = 10;
        let mut chain = enc_value(&pk, &sk, 2, &mut rng);
        for _ in 1..N {
            let two = enc_value(&pk, &sk, 2, &mut rng);
            chain = ct_mul(&pk, &chain, &two, &mut rng);
        }

        assert_eq!(dec_value(&pk, &sk, &chain).expect("dec").lo, 1u64 << N);
    }

    #[test]
    fn factorial() {
        let mut rng = StdRng::seed_from_u64(9);
        let (pk, sk) = keygen(&Params::default(), &mut rng).expect("keygen");

        let mut fact = enc_value(&pk, &sk, 1, &mut rng);
        for i in 2..=10 {
            let ci = enc_value(&pk, &sk, i, &mut rng);
            fact = ct_mul(&pk, &fact, &ci, &mut rng);
        }

        assert_eq!(dec_value(&pk, &sk, &fact).expect("dec").lo, 3_628_800);
    }

    #[test]
    fn recrypt_preserves_value() {
        let mut rng = StdRng::seed_from_u64(10);
        let (pk, sk) = keygen(&Params::default(), &mut rng).expect("keygen");
        let ek = make_evalkey(&pk, &sk, 8, 3, &mut rng);

        let x = enc_value(&pk, &sk, X, &mut rng);
        let x2 = ct_mul(&pk, &x, &x, &mut rng);
        let x3 = ct_mul(&pk, &x2, &x, &mut rng);

        let before = dec_value(&pk, &sk, &x3).expect("dec");
        let fresh = ct_recrypt(&pk, &ek, &x3, &mut rng);
        let after = dec_value(&pk, &sk, &fresh).expect("dec");

        assert_eq!(ct::fp_eq(&before, &after), 1);

        let d = sigma_density(&pk, &fresh);
        assert!(
            (pk.params.recrypt_lo..=pk.params.recrypt_hi).contains(&d),
            "density {} outside the recrypt band",
            d
        );

        // The evaluation key's unit ciphertext is usable as an operand.
        let x3_again = ct_mul(&pk, &fresh, &ek.enc_one, &mut rng);
        assert_eq!(
            ct::fp_eq(&dec_value(&pk, &sk, &x3_again).expect("dec"), &before),
            1
        );
    }

    #[test]
    fn ubk_preserves_value() {
        let mut rng = StdRng::seed_from_u64(11);
        let (pk, sk) = keygen(&Params::default(), &mut rng).expect("keygen");

        let x = enc_value(&pk, &sk, X, &mut rng);
        let y = enc_value(&pk, &sk, Y, &mut rng);
        let p = ct_mul(&pk, &x, &y, &mut rng);

        let before = dec_value(&pk, &sk, &p).expect("dec");
        let mut permuted = p.clone();
        ubk_apply(&pk, &mut permuted);
        let after = dec_value(&pk, &sk, &permuted).expect("dec");

        assert_eq!(ct::fp_eq(&before, &after), 1);
    }

    #[test]
    fn compaction_preserves_value() {
        let mut rng = StdRng::seed_from_u64(12);
        let (pk, sk) = keygen(&Params::default(), &mut rng).expect("keygen");

        let x = enc_value(&pk, &sk, X, &mut rng);
        let y = enc_value(&pk, &sk, Y, &mut rng);
        let mut p = ct_mul(&pk, &x, &y, &mut rng);

        let before = dec_value(&pk, &sk, &p).expect("dec");
        let edges_before = p.edges.len();

        compact_edges(&pk, &mut p);
        compact_layers(&mut p);

        assert!(p.edges.len() <= edges_before);
        let after = dec_value(&pk, &sk, &p).expect("dec");
        assert_eq!(ct::fp_eq(&before, &after), 1);
    }

    #[test]
    fn product_layer_sums() {
        let mut rng = StdRng::seed_from_u64(13);
        let (pk, sk) = keygen(&Params::default(), &mut rng).expect("keygen");

        let x = enc_value(&pk, &sk, X, &mut rng);
        let y = enc_value(&pk, &sk, Y, &mut rng);
        let p = ct_mul(&pk, &x, &y, &mut rng);

        assert!(product_sums_consistent(&pk, &x, &y, &p));
    }

    #[test]
    fn scale_neg_div() {
        let mut rng = StdRng::seed_from_u64(14);
        let (pk, sk) = keygen(&Params::default(), &mut rng).expect("keygen");

        let x = enc_value(&pk, &sk, 84, &mut rng);

        let neg = ct_neg(&pk, &x);
        let dec_neg = dec_value(&pk, &sk, &neg).expect("dec");
        assert_eq!(ct::fp_eq(&dec_neg, &fp_neg(fp_from_u64(84))), 1);

        let half = ct_div_const(&pk, &x, fp_from_u64(2)).expect("div");
        assert_eq!(dec_value(&pk, &sk, &half).expect("dec").lo, 42);

        assert!(ct_div_const(&pk, &x, FP_ZERO).is_err());
    }

    #[test]
    fn commitments_are_unique() {
        let mut rng = StdRng::seed_from_u64(15);
        let (pk, sk) = keygen(&Params::default(), &mut rng).expect("keygen");

        let x = enc_value(&pk, &sk, X, &mut rng);
        let x_again = enc_value(&pk, &sk, X, &mut rng);
        let y = enc_value(&pk, &sk, Y, &mut rng);

        let cx = commit_ct(&pk, &x);
        let cx2 = commit_ct(&pk, &x_again);
        let cy = commit_ct(&pk, &y);

        assert_ne!(cx, cx2);
        assert_ne!(cx, cy);
        assert_eq!(cx, commit_ct(&pk, &x));

        // Two encryptions of one value share no structural randomness.
        assert_ne!(x.edges[0].weight.lo, x_again.edges[0].weight.lo);
    }

    #[test]
    fn text_roundtrip() {
        let mut rng = StdRng::seed_from_u64(16);
        let (pk, sk) = keygen(&Params::default(), &mut rng).expect("keygen");

        let msg = "test_test_test data dadfs98324134;'!//.d,d''d,mm";
        let cts = enc_text(&pk, &sk, msg, &mut rng);
        assert_eq!(cts.len(), (msg.len() + 13) / 14);

        let back = dec_text(&pk, &sk, &cts).expect("dec_text");
        assert_eq!(back, msg);

        let empty = enc_text(&pk, &sk, "", &mut rng);
        assert!(empty.is_empty());
        assert_eq!(dec_text(&pk, &sk, &empty).expect("dec_text"), "");
    }
}
