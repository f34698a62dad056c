use shared::models::*;
use shared::tally::SubmitOutcome;
use shared::validation::validate_option;
use tracing::{debug, info};
use uuid::Uuid;
use crate::error::ApiError;
use crate::store::VoteStore;

pub struct VoteProcessor;

impl VoteProcessor {
    pub async fn submit_vote(
        store: &(impl VoteStore + ?Sized),
        user_id: Uuid,
        option: Option<&str>,
    ) -> Result<SubmitOutcome, ApiError> {
        let option = validate_option(option)?;
        let change = store.record_vote(user_id, &option).await?;

        match &change.retract {
            Some(previous) if *previous != change.cast => {
                info!("User {} changed vote from {:?} to {:?}", user_id, previous, change.cast)
            }
            Some(_) => debug!("User {} resubmitted {:?}", user_id, change.cast),
            None => info!("User {} voted for {:?}", user_id, change.cast),
        }

        Ok(change.outcome)
    }

    pub async fn get_vote_options(store: &(impl VoteStore + ?Sized)) -> Result<Vec<VoteOption>, ApiError> {
        Ok(store.list_options().await?)
    }

    pub async fn get_vote_results(store: &(impl VoteStore + ?Sized)) -> Result<VoteResults, ApiError> {
        let results = store.ranked_options().await?;
        let total_votes = store.count_votes().await?;
        Ok(VoteResults { total_votes, results })
    }

    pub async fn get_user_vote(store: &(impl VoteStore + ?Sized), user_id: Uuid) -> Result<UserVote, ApiError> {
        let vote = store.find_vote(user_id).await?;
        Ok(UserVote { option: vote.map(|v| v.option) })
    }

    /// Registers `names` with zero counts; existing options are left untouched.
    pub async fn seed_options(store: &(impl VoteStore + ?Sized), names: &[String]) -> Result<(), ApiError> {
        for name in names {
            let option = validate_option(Some(name))?;
            let seeded = store.ensure_option(&option).await?;
            debug!("Option {:?} ready with count {}", seeded.name, seeded.count);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::tally::count_drift;
    use crate::store::MemoryStore;

    fn counts(options: &[VoteOption]) -> Vec<(&str, i64)> {
        options.iter().map(|o| (o.name.as_str(), o.count)).collect()
    }

    async fn assert_consistent(store: &MemoryStore) {
        let options = store.list_options().await.unwrap();
        let votes = store.snapshot_votes().unwrap();
        assert!(count_drift(&options, &votes).is_empty(), "counts drifted: {:?}", count_drift(&options, &votes));
    }

    #[rocket::async_test]
    async fn test_first_vote_creates_option() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        let outcome = VoteProcessor::submit_vote(&store, user, Some("New Option")).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Created);

        let options = VoteProcessor::get_vote_options(&store).await.unwrap();
        assert_eq!(counts(&options), [("New Option", 1)]);
        assert_consistent(&store).await;
    }

    #[rocket::async_test]
    async fn test_change_vote_moves_count() {
        let store = MemoryStore::new();
        let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

        VoteProcessor::submit_vote(&store, u1, Some("A")).await.unwrap();
        VoteProcessor::submit_vote(&store, u2, Some("A")).await.unwrap();
        let outcome = VoteProcessor::submit_vote(&store, u1, Some("B")).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Updated);

        let results = VoteProcessor::get_vote_results(&store).await.unwrap();
        assert_eq!(results.total_votes, 2);
        assert_eq!(counts(&results.results), [("A", 1), ("B", 1)]);
        assert_consistent(&store).await;
    }

    #[rocket::async_test]
    async fn test_same_option_twice_keeps_count() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        VoteProcessor::submit_vote(&store, user, Some("A")).await.unwrap();
        let outcome = VoteProcessor::submit_vote(&store, user, Some("A")).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Updated);

        let options = VoteProcessor::get_vote_options(&store).await.unwrap();
        assert_eq!(counts(&options), [("A", 1)]);
        assert_eq!(VoteProcessor::get_vote_results(&store).await.unwrap().total_votes, 1);
    }

    #[rocket::async_test]
    async fn test_invalid_option_touches_nothing() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        for option in [None, Some(""), Some("   ")] {
            let err = VoteProcessor::submit_vote(&store, user, option).await.unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)));
        }
        assert!(VoteProcessor::get_vote_options(&store).await.unwrap().is_empty());
        assert_eq!(VoteProcessor::get_user_vote(&store, user).await.unwrap().option, None);
    }

    #[rocket::async_test]
    async fn test_option_names_are_trimmed() {
        let store = MemoryStore::new();
        VoteProcessor::submit_vote(&store, Uuid::new_v4(), Some("  A ")).await.unwrap();
        VoteProcessor::submit_vote(&store, Uuid::new_v4(), Some("A")).await.unwrap();

        let options = VoteProcessor::get_vote_options(&store).await.unwrap();
        assert_eq!(counts(&options), [("A", 2)]);
    }

    #[rocket::async_test]
    async fn test_example_scenario() {
        let store = MemoryStore::new();
        let u1 = Uuid::new_v4();

        VoteProcessor::submit_vote(&store, u1, Some("A")).await.unwrap();
        let results = VoteProcessor::get_vote_results(&store).await.unwrap();
        assert_eq!((results.total_votes, counts(&results.results)), (1, vec![("A", 1)]));

        VoteProcessor::submit_vote(&store, u1, Some("B")).await.unwrap();
        assert_eq!(VoteProcessor::get_user_vote(&store, u1).await.unwrap().option.as_deref(), Some("B"));

        let results = VoteProcessor::get_vote_results(&store).await.unwrap();
        assert_eq!(results.total_votes, 1);
        assert_eq!(counts(&results.results), [("B", 1), ("A", 0)]);
    }

    #[rocket::async_test]
    async fn test_last_submission_wins_for_many_users() {
        let store = MemoryStore::new();
        let users: Vec<_> = (0..6).map(|_| Uuid::new_v4()).collect();
        let names = ["A", "B", "C"];

        for round in 0..4 {
            for (i, user) in users.iter().enumerate() {
                let pick = names[(i + round) % names.len()];
                VoteProcessor::submit_vote(&store, *user, Some(pick)).await.unwrap();
                assert_eq!(VoteProcessor::get_user_vote(&store, *user).await.unwrap().option.as_deref(), Some(pick));
            }
            assert_consistent(&store).await;
        }

        let results = VoteProcessor::get_vote_results(&store).await.unwrap();
        assert_eq!(results.total_votes, users.len() as i64);
        assert_eq!(results.results.iter().map(|o| o.count).sum::<i64>(), users.len() as i64);
    }

    #[rocket::async_test]
    async fn test_concurrent_submissions_keep_counts_exact() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let users: Vec<_> = (0..8).map(|_| Uuid::new_v4()).collect();
        let names = ["A", "B", "C"];

        let handles: Vec<_> = (0..5)
            .flat_map(|round| users.iter().enumerate().map(move |(i, user)| (round, i, *user)))
            .map(|(round, i, user)| {
                let store = store.clone();
                let pick = names[(i * 7 + round) % names.len()];
                rocket::tokio::spawn(async move {
                    VoteProcessor::submit_vote(&*store, user, Some(pick)).await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_consistent(&store).await;
        let results = VoteProcessor::get_vote_results(&*store).await.unwrap();
        assert_eq!(results.total_votes, users.len() as i64);
        assert_eq!(results.results.iter().map(|o| o.count).sum::<i64>(), users.len() as i64);
        for user in &users {
            assert!(VoteProcessor::get_user_vote(&*store, *user).await.unwrap().option.is_some());
        }
    }

    #[rocket::async_test]
    async fn test_seeded_options_start_at_zero() {
        let store = MemoryStore::new();
        VoteProcessor::seed_options(&store, &["Option A".into(), "Option B".into()]).await.unwrap();
        VoteProcessor::submit_vote(&store, Uuid::new_v4(), Some("Option B")).await.unwrap();
        VoteProcessor::seed_options(&store, &["Option B".into()]).await.unwrap();

        let options = VoteProcessor::get_vote_options(&store).await.unwrap();
        assert_eq!(counts(&options), [("Option A", 0), ("Option B", 1)]);
    }
}
