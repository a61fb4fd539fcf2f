use rand::seq::SliceRandom;

use crate::dns::DNSResource;

/// Randomizes the order of a response's answer records so repeated queries
/// for the same name don't always hand back the same instance first —
/// cheap load spreading across otherwise-equivalent answers.
///
/// Grounded on `answer_shuffle_test.go`'s behavior (shuffles in place,
/// leaves a single-answer response untouched) and
/// `examples/crywolf-codecrafters-dns-server-rust`'s use of `rand` for
/// exactly this kind of in-place randomization.
pub struct Shuffler;

impl Shuffler {
    pub fn shuffle(answers: &mut [DNSResource]) {
        if answers.len() < 2 {
            return;
        }
        let mut rng = rand::rng();
        answers.shuffle(&mut rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{DNSResourceClass, DNSResourceType};

    fn records(n: u8) -> Vec<DNSResource> {
        (0..n)
            .map(|i| DNSResource {
                labels: vec!["host".into()],
                rtype: DNSResourceType::A,
                rclass: DNSResourceClass::IN,
                ttl: 60,
                rdlength: 4,
                rdata: vec![10, 0, 0, i],
                parsed_rdata: Some(format!("10.0.0.{i}")),
                raw_class: None,
            })
            .collect()
    }

    #[test]
    fn leaves_a_single_answer_untouched() {
        let mut answers = records(1);
        let before = answers[0].clone();
        Shuffler::shuffle(&mut answers);
        assert_eq!(answers[0], before);
    }

    #[test]
    fn preserves_the_full_set_of_answers() {
        let mut answers = records(10);
        let original_rdata: Vec<_> = answers.iter().map(|r| r.rdata.clone()).collect();
        Shuffler::shuffle(&mut answers);
        let mut shuffled_rdata: Vec<_> = answers.iter().map(|r| r.rdata.clone()).collect();
        shuffled_rdata.sort();
        let mut sorted_original = original_rdata;
        sorted_original.sort();
        assert_eq!(shuffled_rdata, sorted_original);
    }
}
