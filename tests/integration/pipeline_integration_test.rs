//! End-to-end: encode a kernel, ship it as bytes, reload and execute it
//!
//! The executor's results are checked against the same computation written
//! with the lane vector operations.

use gen_compute::isa::{
    ConditionalModifier, Destination, Encoder, EncoderConfig, FlagRegister, GenProgram, InstructionStream, RegType,
    Source,
};
use gen_compute::{ops, ConstantPool, GenVec, HalfFloat, Simulator};
use gen_sim::{GenF1, GenF16};
use gen_tracing::performance::record_simulation;
use gen_tracing::{build_subscriber, TracingConfig};

const INPUT: u8 = 4;
const CLAMPED: u8 = 10;
const SCALED: u8 = 12;

/// `out = min(x, 8.0) * 0.5` over sixteen float lanes
fn clamp_and_scale_kernel() -> Encoder {
    let mut encoder = Encoder::new(EncoderConfig::simd16()).unwrap();
    let x = Source::vector(INPUT, RegType::F);
    encoder.cmp(ConditionalModifier::Less, x, Source::imm_f(8.0), None).unwrap();
    encoder.push();
    encoder.curr.predicate_on(FlagRegister::new(0, 0), false);
    encoder.sel(Destination::grf(CLAMPED, RegType::F), x, Source::imm_f(8.0)).unwrap();
    encoder.pop().unwrap();
    encoder
        .mul(
            Destination::grf(SCALED, RegType::F),
            Source::vector(CLAMPED, RegType::F),
            Source::imm_f(0.5),
        )
        .unwrap();
    encoder.eot(127).unwrap();
    encoder
}

fn input() -> GenF16 {
    GenVec::from_fn(|i| i as f32 * 1.5 - 4.0)
}

fn expected(x: &GenF16) -> GenF16 {
    let limit = GenF1::new(8.0);
    let clamped = ops::select(&ops::lt(x, &limit), x, &limit);
    ops::mul(&clamped, &GenF1::new(0.5))
}

#[test]
fn test_stream_bytes_execute_like_lane_ops() {
    let bytes = clamp_and_scale_kernel().into_stream().to_bytes();
    assert_eq!(bytes.len(), 4 * 16);
    let stream = InstructionStream::from_bytes(&bytes).unwrap();

    let x = input();
    let mut sim = Simulator::default();
    sim.write_lanes(INPUT, &x.to_vec()).unwrap();
    assert_eq!(sim.run(&stream).unwrap(), 4);

    assert_eq!(sim.register::<f32, 4>(SCALED).unwrap(), expected(&x));
    let below = ops::lt(&x, &GenF1::new(8.0)).mask();
    assert_eq!(u32::from(sim.flag(FlagRegister::new(0, 0)).unwrap()), below);
}

#[test]
fn test_program_image_with_constants() {
    let mut program = clamp_and_scale_kernel().into_program("clamp_and_scale");
    let foo = program.constants.append(b"foo", "foo", 3, 1).unwrap().offset();
    let bar = program.constants.append(b"bar", "bar", 3, 4).unwrap().offset();
    assert_eq!((foo, bar), (0, 4));
    assert_eq!(program.constants.data().len(), 7);

    let restored = GenProgram::from_bytes(&program.to_bytes().unwrap()).unwrap();
    assert_eq!(restored, program);
    assert_eq!(restored.simd_width, 16);

    let listing = restored.disassemble();
    assert!(listing.starts_with("// kernel clamp_and_scale simd16"));
    assert!(listing.contains("sel(16)"));
    assert!(listing.contains("// constants"));
    assert!(listing.contains("bar"));
}

#[test]
fn test_constant_pool_feeds_registers() {
    let x = input();
    let mut pool = ConstantPool::new();
    pool.append(b"\x01", "flag", 1, 1).unwrap();
    let values: Vec<u8> = x.iter().flat_map(f32::to_le_bytes).collect();
    let offset = pool.append(&values, "x", values.len() as u32, 32).unwrap().offset();
    assert_eq!(offset, 32);

    let reloaded = ConstantPool::from_bytes(&pool.to_bytes()).unwrap();
    let loaded = GenF16::load_bytes(reloaded.data(), offset as usize).unwrap();
    assert_eq!(loaded, x);

    let mut sim = Simulator::default();
    sim.write_lanes(INPUT, &loaded.to_vec()).unwrap();
    sim.run(clamp_and_scale_kernel().stream()).unwrap();
    assert_eq!(sim.read_lanes::<f32>(SCALED, 16).unwrap(), expected(&x).to_vec());
}

#[test]
fn test_half_constants() {
    let halves = [HalfFloat::from_f32(0.5), HalfFloat::from_f32(-2.0), HalfFloat::MAX];
    let bytes: Vec<u8> = halves.iter().flat_map(|h| h.to_bits().to_le_bytes()).collect();

    let mut pool = ConstantPool::new();
    pool.append(b"pad", "pad", 3, 1).unwrap();
    let entry = pool.append(&bytes, "halves", 6, 2).unwrap().clone();
    assert_eq!(entry.offset(), 4);

    let decoded: Vec<HalfFloat> = pool
        .bytes_of(&entry)
        .chunks_exact(2)
        .map(|pair| HalfFloat::from_bits(u16::from_le_bytes([pair[0], pair[1]])))
        .collect();
    assert_eq!(decoded, halves);
    assert_eq!((decoded[0] * decoded[1]).to_f32(), -1.0);
    assert!((decoded[2] + decoded[2]).is_infinite());
}

#[test]
fn test_runs_under_json_subscriber() {
    let config = TracingConfig {
        directives: Some("gen_sim=trace,gen_isa=trace".to_string()),
        enable_performance_tracing: true,
        ..TracingConfig::for_ci()
    };
    let subscriber = build_subscriber(&config).unwrap();

    let steps = tracing::subscriber::with_default(subscriber, || {
        let stream = {
            let _span = config.perf_span("encode").unwrap();
            clamp_and_scale_kernel().into_stream()
        };
        let mut sim = Simulator::default();
        sim.write_lanes(INPUT, &input().to_vec()).unwrap();
        let (steps, duration_us) = gen_tracing::timed_block!("simulate", { sim.run(&stream).unwrap() });
        record_simulation(steps, duration_us);
        steps
    });
    assert_eq!(steps, 4);
}
