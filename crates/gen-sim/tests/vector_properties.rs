//! Elementwise, broadcast and gather/scatter properties of the lane vectors
//!
//! Each property runs over every vector family (4, 8, 16 and 32 lanes) and
//! the scalar family, with inputs from a seeded generator.

use gen_sim::{ops, GenScalar, GenVec, Lane, Lanes, Mask, SupportedWidth};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const SEED: u64 = 0x6e6e_5100;
const ROUNDS: usize = 64;

fn nonzero_f32(rng: &mut StdRng) -> f32 {
    let magnitude = rng.gen_range(0.25f32..1000.0);
    if rng.gen_bool(0.5) {
        magnitude
    } else {
        -magnitude
    }
}

/// Pair of vectors where roughly a third of the lanes compare equal
fn int_pair<const N: usize>(rng: &mut StdRng) -> (GenVec<i32, N>, GenVec<i32, N>)
where
    Lanes<N>: SupportedWidth,
{
    let a = GenVec::<i32, N>::from_fn(|_| rng.gen_range(-1000..1000));
    let b = GenVec::<i32, N>::from_fn(|i| match rng.gen_range(0..6) {
        0 | 1 => a.lane(i),
        2 => 0,
        _ => rng.gen(),
    });
    (a, b)
}

fn assert_lanes<T: Lane, const N: usize>(name: &str, got: &GenVec<T, N>, expected: impl Fn(usize) -> T)
where
    Lanes<N>: SupportedWidth,
{
    for lane in 0..GenVec::<T, N>::LANES {
        assert_eq!(got.lane(lane), expected(lane), "{name} lane {lane} of {}", GenVec::<T, N>::LANES);
    }
}

fn check_float_ops<const N: usize>(rng: &mut StdRng)
where
    Lanes<N>: SupportedWidth,
{
    for _ in 0..ROUNDS {
        let a = GenVec::<f32, N>::from_fn(|_| rng.gen_range(-1000.0..1000.0));
        let b = GenVec::<f32, N>::from_fn(|_| nonzero_f32(rng));
        let (x, y) = (|i| a.lane(i), |i| b.lane(i));

        assert_lanes("add", &ops::add(&a, &b), |i| x(i) + y(i));
        assert_lanes("sub", &ops::sub(&a, &b), |i| x(i) - y(i));
        assert_lanes("mul", &ops::mul(&a, &b), |i| x(i) * y(i));
        assert_lanes("div", &ops::div(&a, &b), |i| x(i) / y(i));

        assert_lanes("eq", &ops::eq(&a, &a), |_| Mask::TRUE);
        assert_lanes("lt", &ops::lt(&a, &b), |i| Mask::from(x(i) < y(i)));
        assert_lanes("le", &ops::le(&a, &b), |i| Mask::from(x(i) <= y(i)));
        assert_lanes("gt", &ops::gt(&a, &b), |i| Mask::from(x(i) > y(i)));
        assert_lanes("ge", &ops::ge(&a, &b), |i| Mask::from(x(i) >= y(i)));
        assert_lanes("ne", &ops::ne(&a, &b), |i| Mask::from(x(i) != y(i)));
    }
}

fn check_int_ops<const N: usize>(rng: &mut StdRng)
where
    Lanes<N>: SupportedWidth,
{
    for _ in 0..ROUNDS {
        let (a, b) = int_pair::<N>(rng);
        let (x, y) = (|i| a.lane(i), |i| b.lane(i));

        assert_lanes("add", &ops::add(&a, &b), |i| x(i).wrapping_add(y(i)));
        assert_lanes("sub", &ops::sub(&a, &b), |i| x(i).wrapping_sub(y(i)));
        assert_lanes("mul", &ops::mul(&a, &b), |i| x(i).wrapping_mul(y(i)));
        assert_lanes("div", &ops::div(&a, &b), |i| x(i).checked_div(y(i)).unwrap_or(-1));
        assert_lanes("rem", &ops::rem(&a, &b), |i| x(i).checked_rem(y(i)).unwrap_or(x(i)));
        assert_lanes("and", &ops::and(&a, &b), |i| x(i) & y(i));
        assert_lanes("or", &ops::or(&a, &b), |i| x(i) | y(i));
        assert_lanes("xor", &ops::xor(&a, &b), |i| x(i) ^ y(i));

        assert_lanes("eq", &ops::eq(&a, &b), |i| Mask::from(x(i) == y(i)));
        assert_lanes("ne", &ops::ne(&a, &b), |i| Mask::from(x(i) != y(i)));
        assert_lanes("slt", &ops::slt(&a, &b), |i| Mask::from(x(i) < y(i)));
        assert_lanes("sge", &ops::sge(&a, &b), |i| Mask::from(x(i) >= y(i)));
        assert_lanes("ult", &ops::ult(&a, &b), |i| Mask::from((x(i) as u32) < y(i) as u32));
        assert_lanes("ugt", &ops::ugt(&a, &b), |i| Mask::from(x(i) as u32 > y(i) as u32));

        // same bits, unsigned lanes
        let (ua, ub) = (a.cast::<u32>(), b.cast::<u32>());
        assert_eq!(ops::lt(&ua, &ub), ops::ult(&a, &b));
        assert_lanes("udiv", &ops::div(&ua, &ub), |i| (x(i) as u32).checked_div(y(i) as u32).unwrap_or(u32::MAX));
    }
}

fn check_broadcast<const N: usize>(rng: &mut StdRng)
where
    Lanes<N>: SupportedWidth,
{
    for _ in 0..ROUNDS {
        let a = GenVec::<f32, N>::from_fn(|_| rng.gen_range(-10.0..10.0));
        let s = nonzero_f32(rng);
        let (scalar, splat) = (GenScalar::new(s), GenVec::<f32, N>::splat(s));

        assert_eq!(ops::add(&a, &scalar), ops::add(&a, &splat));
        assert_eq!(ops::sub(&scalar, &a), ops::sub(&splat, &a));
        assert_eq!(ops::div(&a, &scalar), ops::div(&a, &splat));
        assert_eq!(ops::lt(&a, &scalar), ops::lt(&a, &splat));

        let (ia, _) = int_pair::<N>(rng);
        let k: i32 = rng.gen();
        assert_eq!(ops::xor(&ia, &GenScalar::new(k)), ops::xor(&ia, &GenVec::splat(k)));
        assert_eq!(ops::sgt(&GenScalar::new(k), &ia), ops::sgt(&GenVec::splat(k), &ia));
    }
}

fn check_gather_scatter<const N: usize>(rng: &mut StdRng)
where
    Lanes<N>: SupportedWidth,
{
    let lanes = GenVec::<u32, N>::LANES;
    for _ in 0..ROUNDS {
        let mut permutation: Vec<u32> = (0..lanes as u32).collect();
        permutation.shuffle(rng);
        let offsets = GenVec::<u32, N>::from_fn(|i| permutation[i] * 4);
        let v = GenVec::<i32, N>::from_fn(|_| rng.gen());

        let mut buffer = vec![0u8; lanes * 4];
        v.scatter(&mut buffer, &offsets).unwrap();
        assert_eq!(GenVec::<i32, N>::gather(&buffer, &offsets).unwrap(), v);

        let stored = GenVec::<i32, N>::load_bytes(&buffer, 0).unwrap();
        for (lane, slot) in permutation.iter().enumerate() {
            assert_eq!(stored.lane(*slot as usize), v.lane(lane));
        }
    }
}

macro_rules! width_tests {
    ($($name:ident => $n:literal),* $(,)?) => {
        $(
            mod $name {
                use super::*;

                fn rng() -> StdRng {
                    StdRng::seed_from_u64(SEED + $n)
                }

                #[test]
                fn test_float_elementwise() {
                    check_float_ops::<$n>(&mut rng());
                }

                #[test]
                fn test_int_elementwise() {
                    check_int_ops::<$n>(&mut rng());
                }

                #[test]
                fn test_scalar_broadcast() {
                    check_broadcast::<$n>(&mut rng());
                }

                #[test]
                fn test_gather_scatter_permutation() {
                    check_gather_scatter::<$n>(&mut rng());
                }
            }
        )*
    };
}

width_tests! {
    simd4 => 1,
    simd8 => 2,
    simd16 => 4,
    simd32 => 8,
}

mod simd1 {
    use super::*;
    use gen_sim::ops::scalar;

    #[test]
    fn test_scalar_elementwise() {
        let mut rng = StdRng::seed_from_u64(SEED);
        for _ in 0..ROUNDS * 8 {
            let (x, y) = (rng.gen_range(-1000.0f32..1000.0), nonzero_f32(&mut rng));
            let (a, b) = (GenScalar::new(x), GenScalar::new(y));
            assert_eq!(scalar::add(&a, &b).value(), x + y);
            assert_eq!(scalar::sub(&a, &b).value(), x - y);
            assert_eq!(scalar::mul(&a, &b).value(), x * y);
            assert_eq!(scalar::div(&a, &b).value(), x / y);
            assert_eq!(scalar::lt(&a, &b).mask(), u32::from(x < y));
            assert_eq!(scalar::ge(&a, &b).mask(), u32::from(x >= y));

            let (i, j): (i32, i32) = (rng.gen_range(-1_000_000..1_000_000), rng.gen_range(-50..50));
            let (p, q) = (GenScalar::new(i), GenScalar::new(j));
            assert_eq!(scalar::add(&p, &q).value(), i.wrapping_add(j));
            assert_eq!(scalar::rem(&p, &q).value(), i.checked_rem(j).unwrap_or(i));
            assert_eq!(scalar::and(&p, &q).value(), i & j);
            assert_eq!(scalar::ne(&p, &q).mask(), u32::from(i != j));
            assert_eq!(scalar::ule(&p, &q).mask(), u32::from(i as u32 <= j as u32));
        }
    }

    #[test]
    fn test_gather_scatter_single_lane() {
        let mut rng = StdRng::seed_from_u64(SEED ^ 1);
        let mut buffer = vec![0u8; 64];
        for _ in 0..ROUNDS {
            let offset = GenScalar::new(rng.gen_range(0..16u32) * 4);
            let value = GenScalar::new(rng.gen::<u32>());
            value.scatter(&mut buffer, &offset).unwrap();
            assert_eq!(GenScalar::<u32>::gather(&buffer, &offset).unwrap().value(), value.value());
        }
    }
}
