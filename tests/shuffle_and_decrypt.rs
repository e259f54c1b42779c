//! Scenario 3 (spec.md §8): a 20-ciphertext collection is shuffled three
//! times in a row by a quorum of trustees; every `ShufflingProof::verify`
//! call against the adjacent pair succeeds, and the final threshold
//! decryption recovers the original ballots as a multiset.

mod common;

use votecrypto::keys::PublicKey;
use votecrypto::threshold::ThresholdDecryptionCombinator;
use votecrypto::CiphertextCollection;

#[test]
fn three_shuffles_then_threshold_decrypt_recovers_original_multiset() {
    let (cs, mut rng) = common::test_cryptosystem(1003);
    let n = 5;
    let k = 3;
    let (_trustee_keys, _fps, key_pairs) = common::run_dkg(&cs, n, k, &mut rng);

    let threshold_public = key_pairs[0].public.clone();
    let voting_key = PublicKey::from_element(&cs, threshold_public.y().clone()).unwrap();

    let mut original = Vec::with_capacity(20);
    let mut collection = CiphertextCollection::new(&threshold_public);
    for i in 0..20 {
        let ballot = format!("Dummy vote #{i}");
        original.push(ballot.clone());
        collection.add_ciphertext(voting_key.encrypt_text(&ballot, &mut rng)).unwrap();
    }

    let mut current = collection;
    for _ in 0..3 {
        let (next, proof) = current.shuffle_with_proof(&mut rng).unwrap();
        assert!(proof.verify(&current, &next).unwrap());
        current = next;
    }

    let quorum: Vec<_> = key_pairs.iter().take(k as usize).collect();
    let mut tally = Vec::with_capacity(20);
    for ct in current.iter() {
        let mut combinator = ThresholdDecryptionCombinator::new(threshold_public.clone(), ct.clone());
        for kp in &quorum {
            let pd = kp.private.generate_partial_decryption(ct, &mut rng).unwrap();
            combinator.add_partial_decryption(pd).unwrap();
        }
        let bytes = combinator.decrypt_to_bytes().unwrap();
        tally.push(String::from_utf8(bytes).unwrap());
    }

    let mut expected = original;
    expected.sort();
    tally.sort();
    assert_eq!(tally, expected);
}
