//! Cross-stage candidate merging.
//!
//! Candidates are identified by the fuzzy `(normalized_name,
//! normalized_title)` key. Scalar conflicts resolve toward the higher email
//! confidence, then the later stage; source lists are unioned. The merge is
//! idempotent: merging a set with itself yields the same set.

use crate::domain::Candidate;

pub fn merge_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut merged: Vec<Candidate> = Vec::new();

    for candidate in candidates {
        let key = candidate.merge_key();
        match merged.iter_mut().find(|existing| existing.merge_key() == key) {
            Some(existing) => merge_into(existing, candidate),
            None => merged.push(candidate),
        }
    }

    merged
}

fn merge_into(base: &mut Candidate, mut incoming: Candidate) {
    let base_confidence = base.email_confidence.unwrap_or(0);
    let incoming_confidence = incoming.email_confidence.unwrap_or(0);
    let incoming_wins = incoming_confidence > base_confidence
        || (incoming_confidence == base_confidence
            && incoming.stage_of_origin > base.stage_of_origin);

    let origin_stage = base.stage_of_origin.min(incoming.stage_of_origin);

    if incoming_wins {
        std::mem::swap(base, &mut incoming);
    }
    let loser = incoming;

    if base.email.is_none() && loser.email.is_some() {
        base.email = loser.email;
        base.email_confidence = loser.email_confidence;
        base.email_source = loser.email_source;
    }
    if base.phone.is_none() {
        base.phone = loser.phone;
        base.phone_source = loser.phone_source;
    }
    if base.linkedin_url.is_none() {
        base.linkedin_url = loser.linkedin_url;
    }
    if base.tenure_years.is_none() {
        base.tenure_years = loser.tenure_years;
    }
    if base.start_date.is_none() {
        base.start_date = loser.start_date;
    }
    base.employment_verified = base.employment_verified || loser.employment_verified;

    match (&base.provisional_email, loser.provisional_email) {
        (None, Some(candidate)) => base.provisional_email = Some(candidate),
        (Some(current), Some(candidate)) if candidate.confidence > current.confidence => {
            base.provisional_email = Some(candidate);
        }
        _ => {}
    }

    for source in loser.sources {
        base.push_source(source);
    }

    // Provenance keeps the stage that first surfaced the person.
    base.stage_of_origin = origin_stage;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DiscoveryStage;

    fn directory_candidate() -> Candidate {
        Candidate::new("Stacy Foster", "General Manager", DiscoveryStage::Directory)
            .with_source("https://vsga.org/courselisting/11950")
    }

    fn finder_candidate() -> Candidate {
        let mut c = Candidate::new(
            "Stacy Foster",
            "General Manager (Club)",
            DiscoveryStage::EmailFinder,
        )
        .with_source("https://hunter.io/richmondcountryclubva.com");
        c.email = Some(String::from("stacy.foster@richmondcountryclubva.com"));
        c.email_confidence = Some(95);
        c.email_source = Some(String::from("email_finder"));
        c
    }

    #[test]
    fn same_person_across_stages_collapses_to_one() {
        let merged = merge_candidates(vec![directory_candidate(), finder_candidate()]);

        assert_eq!(merged.len(), 1);
        let contact = &merged[0];
        assert_eq!(contact.email_confidence, Some(95));
        assert_eq!(contact.sources.len(), 2);
        assert_eq!(contact.stage_of_origin, DiscoveryStage::Directory);
    }

    #[test]
    fn higher_email_confidence_wins_scalar_conflicts() {
        let mut low = finder_candidate();
        low.email = Some(String::from("s.foster@richmondcountryclubva.com"));
        low.email_confidence = Some(91);
        low.stage_of_origin = DiscoveryStage::Pattern;

        let high = finder_candidate();
        let merged = merge_candidates(vec![low, high]);

        assert_eq!(
            merged[0].email.as_deref(),
            Some("stacy.foster@richmondcountryclubva.com")
        );
    }

    #[test]
    fn equal_confidence_prefers_the_later_stage() {
        let mut early = finder_candidate();
        early.stage_of_origin = DiscoveryStage::PeopleSearch;
        early.phone = Some(String::from("(804) 111-1111"));

        let mut late = finder_candidate();
        late.stage_of_origin = DiscoveryStage::LlmSearch;
        late.phone = Some(String::from("(804) 784-5663"));

        let merged = merge_candidates(vec![early, late]);
        assert_eq!(merged[0].phone.as_deref(), Some("(804) 784-5663"));
        assert_eq!(merged[0].stage_of_origin, DiscoveryStage::PeopleSearch);
    }

    #[test]
    fn gaps_are_filled_from_the_losing_record() {
        let mut with_linkedin = directory_candidate();
        with_linkedin.linkedin_url = Some(String::from("https://www.linkedin.com/in/stacy-foster"));

        let merged = merge_candidates(vec![finder_candidate(), with_linkedin]);
        assert_eq!(merged[0].email_confidence, Some(95));
        assert_eq!(
            merged[0].linkedin_url.as_deref(),
            Some("https://www.linkedin.com/in/stacy-foster")
        );
    }

    #[test]
    fn merging_a_set_with_itself_is_idempotent() {
        let set = vec![directory_candidate(), finder_candidate()];
        let once = merge_candidates(set.clone());

        let mut doubled = once.clone();
        doubled.extend(once.clone());
        let twice = merge_candidates(doubled);

        assert_eq!(once, twice);
    }

    #[test]
    fn distinct_people_never_merge() {
        let merged = merge_candidates(vec![
            directory_candidate(),
            Candidate::new("Bill Ranson", "Head Golf Professional", DiscoveryStage::Directory),
        ]);
        assert_eq!(merged.len(), 2);
    }
}
