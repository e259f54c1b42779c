//! Scenario 4 (spec.md §8): a cooperating trustee submits a partial
//! decryption with `u_b` incremented by 1 in a single block; the
//! combinator must reject it with `InvalidPartialDecryptionProof`.

mod common;

use num_bigint::BigUint;

use votecrypto::group;
use votecrypto::keys::PublicKey;
use votecrypto::threshold::ThresholdDecryptionCombinator;
use votecrypto::PvError;

#[test]
fn incremented_u_is_rejected() {
    let (cs, mut rng) = common::test_cryptosystem(1004);
    let (_trustee_keys, _fps, key_pairs) = common::run_dkg(&cs, 3, 2, &mut rng);

    let threshold_public = key_pairs[0].public.clone();
    let voting_key = PublicKey::from_element(&cs, threshold_public.y().clone()).unwrap();
    let ct = voting_key.encrypt_text("Dummy vote #0", &mut rng);

    let mut combinator = ThresholdDecryptionCombinator::new(threshold_public.clone(), ct.clone());

    let mut honest_pd = key_pairs[0].private.generate_partial_decryption(&ct, &mut rng).unwrap();
    let tampered = &mut honest_pd.blocks_mut()[0];
    tampered.proof.u = group::reduce(&(&tampered.proof.u + BigUint::from(1u8)), cs.q());

    let result = combinator.add_partial_decryption(honest_pd);
    assert!(matches!(result, Err(PvError::InvalidPartialDecryptionProof { trustee: 0 })));
}
