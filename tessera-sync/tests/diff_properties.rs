use proptest::prelude::*;
use tessera_sync::diff::{diff, render_unified, LineKind};

/// Text built from a four-line alphabet so duplicate lines are the norm.
fn text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec!["a", "b", "c", ""]), 0..16).prop_map(|lines| lines.join("\n"))
}

proptest! {
    #[test]
    fn identical_inputs_have_no_changes(t in text()) {
        let result = diff(&t, &t);
        prop_assert!(result.is_empty());
        prop_assert!(result.lines.is_empty());
        prop_assert!(render_unified(&t, &t, "a", "b").is_empty());
    }

    #[test]
    fn appending_one_line_is_exactly_one_addition(
        t in text(),
        extra in prop::sample::select(vec!["a", "b", "c", ""]),
    ) {
        let appended = format!("{t}\n{extra}");
        let result = diff(&t, &appended);
        prop_assert_eq!(result.additions, 1);
        prop_assert_eq!(result.deletions, 0);
    }

    #[test]
    fn steps_replay_both_sides(old in text(), new in text()) {
        // Identical inputs short-circuit to an empty result.
        prop_assume!(old != new);
        let result = diff(&old, &new);

        let rebuilt_new: Vec<&str> = result
            .lines
            .iter()
            .filter(|l| l.kind != LineKind::Remove)
            .map(|l| l.text.as_str())
            .collect();
        let rebuilt_old: Vec<&str> = result
            .lines
            .iter()
            .filter(|l| l.kind != LineKind::Add)
            .map(|l| l.text.as_str())
            .collect();
        prop_assert_eq!(rebuilt_new, new.split('\n').collect::<Vec<_>>());
        prop_assert_eq!(rebuilt_old, old.split('\n').collect::<Vec<_>>());

        let adds = result.lines.iter().filter(|l| l.kind == LineKind::Add).count();
        let removes = result.lines.iter().filter(|l| l.kind == LineKind::Remove).count();
        prop_assert_eq!((adds, removes), (result.additions, result.deletions));
    }

    #[test]
    fn repeated_runs_give_identical_output(old in text(), new in text()) {
        prop_assert_eq!(diff(&old, &new), diff(&old, &new));
    }

    #[test]
    fn change_count_is_minimal_for_swapped_inputs(old in text(), new in text()) {
        // Both directions share one LCS length, so the change totals agree.
        let forward = diff(&old, &new);
        let backward = diff(&new, &old);
        prop_assert_eq!(forward.additions, backward.deletions);
        prop_assert_eq!(forward.deletions, backward.additions);
    }
}
