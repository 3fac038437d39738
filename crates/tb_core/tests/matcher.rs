use chrono::NaiveDate;
use tb_core::assignment::{AssignmentStrategy, Candidate, GreedyAssignment, OptimalAssignment};
use tb_core::matcher::{match_residuals, score_tasks, MatcherParams};
use tb_core::models::{ObsidianTask, Priority, RemindersTask, TaskStatus, Timestamp};
use tb_core::types::{ListId, ObsId, RemId, VaultId};

fn obs_task(id: &str, description: &str) -> ObsidianTask {
    ObsidianTask {
        id: ObsId(id.to_string()),
        vault_id: VaultId("vault-1".to_string()),
        file_path: "tasks.md".to_string(),
        line_number: 1,
        block_id: Some(id.to_string()),
        status: TaskStatus::Todo,
        description: description.to_string(),
        raw_line: format!("- [ ] {description}"),
        due: None,
        completion_date: None,
        priority: None,
        tags: Vec::new(),
        notes: None,
        created_at: Timestamp::Absent,
        modified_at: Timestamp::Absent,
    }
}

fn rem_task(id: &str, title: &str) -> RemindersTask {
    RemindersTask {
        id: RemId(id.to_string()),
        list_id: ListId("L-default".to_string()),
        list_name: "Default".to_string(),
        status: TaskStatus::Todo,
        title: title.to_string(),
        due: None,
        priority: None,
        notes: None,
        tags: Vec::new(),
        created_at: Timestamp::Absent,
        modified_at: Timestamp::Absent,
    }
}

fn day(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").expect("valid date")
}

#[test]
fn identical_tasks_score_one_and_match() {
    let mut obs = obs_task("o1", "Buy milk");
    obs.due = Some(day("2025-01-15"));
    let mut rem = rem_task("r1", "Buy milk");
    rem.due = Some(day("2025-01-15"));

    let params = MatcherParams::default();
    let score = score_tasks(&obs, &rem, &params);
    assert!((score - 1.0).abs() < 1e-9, "score was {score}");

    let proposals = match_residuals(&[&obs], &[&rem], &params);
    assert_eq!(proposals.len(), 1);
    assert_eq!(proposals[0].obs_id, ObsId("o1".to_string()));
    assert_eq!(proposals[0].rem_id, RemId("r1".to_string()));
}

#[test]
fn dissimilar_descriptions_fall_below_min_score() {
    let obs = obs_task("o1", "Buy milk");
    let rem = rem_task("r1", "Write quarterly report");
    let params = MatcherParams::default();
    assert!(score_tasks(&obs, &rem, &params) < params.min_score);
    assert!(match_residuals(&[&obs], &[&rem], &params).is_empty());
}

#[test]
fn matching_is_one_to_one_with_lexicographic_tie_break() {
    let obs_a = obs_task("o-a", "Water the plants");
    let obs_b = obs_task("o-b", "Water the plants");
    let rem_a = rem_task("r-a", "Water the plants");
    let rem_b = rem_task("r-b", "Water the plants");

    let params = MatcherParams::default();
    let proposals = match_residuals(&[&obs_b, &obs_a], &[&rem_b, &rem_a], &params);
    assert_eq!(proposals.len(), 2);
    // Every pair scores identically; ids break the tie.
    assert_eq!(proposals[0].obs_id, ObsId("o-a".to_string()));
    assert_eq!(proposals[0].rem_id, RemId("r-a".to_string()));
    assert_eq!(proposals[1].obs_id, ObsId("o-b".to_string()));
    assert_eq!(proposals[1].rem_id, RemId("r-b".to_string()));
}

#[test]
fn url_only_descriptions_compare_raw() {
    let obs = obs_task("o1", "https://example.com/ticket/42");
    let rem_same = rem_task("r1", "https://example.com/ticket/42");
    let rem_other = rem_task("r2", "https://example.com/ticket/43");

    let params = MatcherParams::default();
    assert!(score_tasks(&obs, &rem_same, &params) >= params.min_score);
    assert!(score_tasks(&obs, &rem_other, &params) < params.min_score);
}

#[test]
fn due_date_proximity_falls_off_linearly() {
    let params = MatcherParams::default();

    let mut obs = obs_task("o1", "Pay rent");
    obs.due = Some(day("2025-02-01"));
    let mut rem = rem_task("r1", "Pay rent");

    rem.due = Some(day("2025-02-02"));
    let near = score_tasks(&obs, &rem, &params);
    assert!((near - 0.875).abs() < 1e-9, "near score was {near}");

    rem.due = Some(day("2025-02-04"));
    let far = score_tasks(&obs, &rem, &params);
    assert!((far - 0.75).abs() < 1e-9, "far score was {far}");
}

#[test]
fn one_sided_due_date_scores_zero_for_the_date_component() {
    let params = MatcherParams::default();
    let mut obs = obs_task("o1", "Call the dentist");
    obs.due = Some(day("2025-03-01"));
    let rem = rem_task("r1", "Call the dentist");
    let score = score_tasks(&obs, &rem, &params);
    assert!((score - 0.75).abs() < 1e-9, "score was {score}");
}

#[test]
fn priority_equality_contributes_its_weight() {
    let params = MatcherParams::default();
    let mut obs = obs_task("o1", "Ship release");
    obs.priority = Some(Priority::High);
    let mut rem = rem_task("r1", "Ship release");
    rem.priority = Some(Priority::Low);
    let mismatched = score_tasks(&obs, &rem, &params);
    rem.priority = Some(Priority::High);
    let matched = score_tasks(&obs, &rem, &params);
    assert!((matched - mismatched - 0.05).abs() < 1e-9);
}

#[test]
fn optimal_assignment_beats_greedy_on_crossing_pairs() {
    // Greedy grabs the single best pair and strands the second row with a
    // poor partner; the optimal solver takes the crossing.
    let candidates = vec![
        Candidate { row: 0, col: 0, score: 0.90 },
        Candidate { row: 0, col: 1, score: 0.80 },
        Candidate { row: 1, col: 0, score: 0.85 },
        Candidate { row: 1, col: 1, score: 0.20 },
    ];

    let greedy = GreedyAssignment.assign(2, 2, &candidates);
    assert_eq!(greedy.len(), 2);
    assert_eq!((greedy[0].row, greedy[0].col), (0, 0));
    assert_eq!((greedy[1].row, greedy[1].col), (1, 1));

    let optimal = OptimalAssignment.assign(2, 2, &candidates);
    assert_eq!(optimal.len(), 2);
    assert_eq!((optimal[0].row, optimal[0].col), (0, 1));
    assert_eq!((optimal[1].row, optimal[1].col), (1, 0));
}

#[test]
fn strategies_agree_when_the_best_choice_is_unambiguous() {
    let candidates = vec![
        Candidate { row: 0, col: 0, score: 0.95 },
        Candidate { row: 1, col: 1, score: 0.90 },
        Candidate { row: 1, col: 0, score: 0.10 },
    ];
    let greedy = GreedyAssignment.assign(2, 2, &candidates);
    let optimal = OptimalAssignment.assign(2, 2, &candidates);
    assert_eq!(greedy, optimal);
}
