use proptest::prelude::*;
use sessionstat_engine::Registrar;
use sessionstat_types::CompletedSession;

const W: i64 = 1_000;
const USERS: [&str; 4] = ["alice", "bob", "carol", "dave"];

#[derive(Debug, Clone)]
struct Op {
    user: usize,
    gap: i64,
    duration: i64,
    query_user: Option<usize>,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    (
        0..USERS.len(),
        0i64..400,
        1i64..5_000,
        proptest::option::of(0..USERS.len()),
    )
        .prop_map(|(user, gap, duration, query_user)| Op {
            user,
            gap,
            duration,
            query_user,
        })
}

fn expected(model: &[CompletedSession], user: Option<&str>, now: i64) -> Vec<i64> {
    model
        .iter()
        .filter(|s| now - s.end_timestamp <= W)
        .filter(|s| user.is_none_or(|u| s.user_id == u))
        .map(|s| s.duration)
        .collect()
}

proptest! {
    #[test]
    fn durations_match_window_model(
        ops in proptest::collection::vec(op_strategy(), 0..200),
        tail in 0i64..3_000,
    ) {
        let mut registrar = Registrar::new(W);
        let mut model = Vec::new();
        let mut now = 0;

        for op in &ops {
            now += op.gap;
            let session = CompletedSession::new(USERS[op.user], now, op.duration);
            model.push(session.clone());
            registrar.insert(session, now);

            if let Some(q) = op.query_user {
                let user = USERS[q];
                prop_assert_eq!(
                    registrar.user_durations(user, now),
                    expected(&model, Some(user), now)
                );
            }
            registrar.check_consistency();
        }

        let now = now + tail;
        prop_assert_eq!(registrar.all_durations(now), expected(&model, None, now));
        for user in USERS {
            prop_assert_eq!(
                registrar.user_durations(user, now),
                expected(&model, Some(user), now)
            );
        }
        registrar.check_consistency();
    }

    #[test]
    fn out_of_order_ends_are_never_reported_stale(
        ops in proptest::collection::vec((op_strategy(), 0i64..2_500), 0..200),
        tail in 0i64..3_000,
    ) {
        let mut registrar = Registrar::new(W);
        let mut model = Vec::new();
        let mut now = 0;

        for (op, skew) in &ops {
            now += op.gap;
            let session = CompletedSession::new(USERS[op.user], now - skew, op.duration);
            model.push(session.clone());
            registrar.insert(session, now);

            if let Some(q) = op.query_user {
                let user = USERS[q];
                prop_assert_eq!(
                    registrar.user_durations(user, now),
                    expected(&model, Some(user), now)
                );
            }
            registrar.check_consistency();
        }

        let now = now + tail;
        prop_assert_eq!(registrar.all_durations(now), expected(&model, None, now));
        for user in USERS {
            prop_assert_eq!(
                registrar.user_durations(user, now),
                expected(&model, Some(user), now)
            );
        }
        registrar.check_consistency();

        let later = now + W + 1;
        prop_assert!(registrar.all_durations(later).is_empty());
        prop_assert_eq!(registrar.user_count(), 0);
        registrar.check_consistency();
    }

    #[test]
    fn expired_users_leave_no_bookkeeping(
        ops in proptest::collection::vec(op_strategy(), 1..100),
    ) {
        let mut registrar = Registrar::new(W);
        let mut now = 0;
        for op in &ops {
            now += op.gap;
            registrar.insert(CompletedSession::new(USERS[op.user], now, op.duration), now);
        }

        let later = now + W + 1;
        prop_assert!(registrar.all_durations(later).is_empty());
        prop_assert_eq!(registrar.user_count(), 0);
        prop_assert_eq!(registrar.len(), 0);
        for user in USERS {
            prop_assert!(!registrar.contains_user(user));
        }
        registrar.check_consistency();
    }
}
