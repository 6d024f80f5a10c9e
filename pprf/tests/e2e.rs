use ggm_pprf::shared::SharedPprf;
use ggm_pprf::*;

use rand::seq::SliceRandom;
use rand::thread_rng;

const DEPTH: u8 = 6;

fn leaf(index: u64) -> Path {
    Path::from_index(index, DEPTH).unwrap()
}

fn all_evals(pprf: &GGM) -> Vec<Option<Key>> {
    (0..1u64 << DEPTH).map(|i| pprf.eval(&leaf(i)).ok()).collect()
}

#[test]
fn reference_vector() {
    let params = Params::new(DEPTH, 16).unwrap();
    let pprf = GGM::from_root(params, Key::zero(16)).unwrap();
    let out = pprf.eval(&leaf(0b100100)).unwrap();
    assert_eq!(
        out.as_bytes(),
        hex::decode("d436ae44ce57f972a5b10b702e802389").unwrap().as_slice()
    );
}

#[test]
fn puncture_persist_restore_cycle() {
    let params = Params::new(DEPTH, 16).unwrap();
    let mut pprf = GGM::setup(params).unwrap();
    let original = all_evals(&pprf);

    let mut order: Vec<u64> = (0..1u64 << DEPTH).collect();
    order.shuffle(&mut thread_rng());

    for (n, &target) in order.iter().enumerate() {
        pprf.puncture(&leaf(target)).unwrap();

        // Persist and restore after every puncture, as a caller would.
        let bytes = pprf.to_bytes().unwrap();
        pprf = GGM::from_bytes(&bytes).unwrap();

        let punctured = &order[..=n];
        for (i, value) in all_evals(&pprf).into_iter().enumerate() {
            if punctured.contains(&(i as u64)) {
                assert!(value.is_none(), "leaf {} should be punctured", i);
            } else {
                assert_eq!(value, original[i], "leaf {} changed", i);
            }
        }
        assert_eq!(pprf.num_punctures(), n as u64 + 1);
    }
    assert!(pprf.frontier().is_empty());
}

#[test]
fn errors_carry_context() {
    let params = Params::new(DEPTH, 16).unwrap();
    let mut pprf = GGM::setup(params).unwrap();
    pprf.puncture(&leaf(5)).unwrap();

    let err = pprf.eval(&leaf(5)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Path 000101 is punctured, no frontier entry covers it"
    );
    let err = pprf.puncture(&leaf(5)).unwrap_err();
    assert_eq!(err.to_string(), "Path 000101 has already been punctured");
    let err = pprf.eval(&Path::from_index(5, 4).unwrap()).unwrap_err();
    assert_eq!(
        err,
        PPRFError::BadPathLength {
            actual: 4,
            expected: 6
        }
    );
}

#[test]
fn shared_engine_round_trip() {
    let params = Params::new(DEPTH, 32).unwrap();
    let pprf = GGM::setup(params).unwrap();
    let before = pprf.eval(&leaf(40)).unwrap();
    let shared = SharedPprf::new(pprf);
    shared.puncture(&leaf(41)).unwrap();

    let restored = GGM::from_bytes(&shared.encode().unwrap()).unwrap();
    assert_eq!(restored.eval(&leaf(40)).unwrap(), before);
    assert!(restored.is_punctured(&leaf(41)).unwrap());
    assert_eq!(restored.params().key_size(), 32);
}
