//! Property-based tests for classification, the checkpoint ledger and rollback.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use proptest::prelude::*;
use remodel::checkpoint::{GeneratedFile, RunManifest, StageMetadata, CHECKPOINT_VERSION};
use remodel::{
    classify, rollback_to_stage, CheckpointStore, Dependency, MigrationState, RunKey, Stage,
};
use std::fs;
use tempfile::TempDir;

const KNOWN_NAMES: &[&str] = &[
    "spring-boot-starter-web",
    "springfox-swagger2",
    "struts2-core",
    "javax.persistence-api",
    "guava",
    "axis",
];

prop_compose! {
    fn arbitrary_dependency()(
        known in 0..KNOWN_NAMES.len() + 2,
        random in "[a-z][a-z0-9-]{0,12}",
        group in prop::option::of(prop::sample::select(vec![
            "org.springframework.boot",
            "io.springfox",
            "com.google.guava",
            "org.example",
        ])),
    ) -> Dependency {
        let name = KNOWN_NAMES.get(known).map(|n| n.to_string()).unwrap_or(random);
        let dep = Dependency::new(name);
        match group {
            Some(group) => dep.with_group(group),
            None => dep,
        }
    }
}

fn arbitrary_stage() -> impl Strategy<Value = Stage> {
    prop::sample::select(Stage::ALL.to_vec())
}

prop_compose! {
    fn arbitrary_state()(variant in 0..7u8, stage in arbitrary_stage()) -> MigrationState {
        match variant {
            0 => MigrationState::NotStarted,
            1 => MigrationState::Scanning,
            2 => MigrationState::Analyzing,
            3 => MigrationState::Running(stage),
            4 => MigrationState::Completed,
            5 => MigrationState::Failed(Some(stage)),
            _ => MigrationState::Aborted,
        }
    }
}

fn files_for(stage: Stage) -> Vec<String> {
    (0..2)
        .map(|i| format!("stage-{}/file-{}.txt", stage.position(), i))
        .collect()
}

/// Record the first `completed` stages, writing their files under `output`.
fn seed_run(dir: &TempDir, completed: usize) -> (CheckpointStore, RunKey) {
    let source = dir.path().join("src");
    let output = dir.path().join("out");
    fs::create_dir_all(&source).unwrap();
    let store = CheckpointStore::new(dir.path().join("ledger"));
    let key = RunKey::for_source(&source);

    store
        .write_manifest(&RunManifest {
            version: CHECKPOINT_VERSION,
            run_key: key.clone(),
            source_path: source,
            output_path: output.clone(),
            tool_version: "test".into(),
            created_at: chrono::Utc::now(),
        })
        .unwrap();

    for stage in &Stage::ALL[..completed] {
        let files = files_for(*stage)
            .into_iter()
            .map(|path| {
                let contents = format!("{} output", path);
                let full = output.join(&path);
                fs::create_dir_all(full.parent().unwrap()).unwrap();
                fs::write(&full, &contents).unwrap();
                GeneratedFile::from_contents(path, contents.as_bytes())
            })
            .collect();
        store
            .record_stage_complete(
                &key,
                *stage,
                StageMetadata {
                    files,
                    generation_calls: 0,
                    input_fingerprint: String::new(),
                },
            )
            .unwrap();
    }

    (store, key)
}

proptest! {
    #[test]
    fn classification_is_a_total_partition(deps in prop::collection::vec(arbitrary_dependency(), 0..20)) {
        let report = classify(&deps);

        prop_assert_eq!(report.total(), deps.len());

        let mut seen: Vec<Dependency> = report
            .verdicts()
            .into_iter()
            .map(|v| v.dependency)
            .collect();
        let mut expected = deps.clone();
        seen.sort();
        expected.sort();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn classification_is_deterministic(deps in prop::collection::vec(arbitrary_dependency(), 0..20)) {
        prop_assert_eq!(classify(&deps), classify(&deps));
    }

    #[test]
    fn final_states_never_transition(from in arbitrary_state(), to in arbitrary_state()) {
        if from.is_final() {
            prop_assert!(!from.can_transition_to(&to));
        }
    }

    #[test]
    fn running_stages_never_go_backwards(a in arbitrary_stage(), b in arbitrary_stage()) {
        let allowed = MigrationState::Running(a).can_transition_to(&MigrationState::Running(b));
        prop_assert_eq!(allowed, b > a);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn rollback_preserves_earlier_checkpoints(completed in 0..=8usize, target in arbitrary_stage()) {
        let dir = TempDir::new().unwrap();
        let (store, key) = seed_run(&dir, completed);

        rollback_to_stage(&store.run_dir(&key), target.name()).unwrap();

        let remaining: Vec<Stage> = store.load(&key).unwrap().iter().map(|c| c.stage).collect();
        let expected: Vec<Stage> = Stage::ALL[..completed]
            .iter()
            .copied()
            .filter(|s| *s < target)
            .collect();
        prop_assert_eq!(&remaining, &expected);

        let output = dir.path().join("out");
        for stage in &Stage::ALL[..completed] {
            for file in files_for(*stage) {
                prop_assert_eq!(output.join(&file).exists(), *stage < target);
            }
        }
    }

    #[test]
    fn interrupted_writes_never_surface(completed in 0..=8usize, garbage in ".{0,64}") {
        let dir = TempDir::new().unwrap();
        let (store, key) = seed_run(&dir, completed);

        // A crash mid-write leaves a temp file; a torn rename is not possible.
        let stages_dir = store.run_dir(&key).join("stages");
        fs::create_dir_all(&stages_dir).unwrap();
        fs::write(stages_dir.join(".08-assembly.json.tmp"), garbage.as_bytes()).unwrap();

        let loaded: Vec<Stage> = store.load(&key).unwrap().iter().map(|c| c.stage).collect();
        prop_assert_eq!(loaded, Stage::ALL[..completed].to_vec());
        prop_assert_eq!(store.exists(&key), completed > 0);
    }
}
