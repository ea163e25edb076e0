//! Expert panel behaviour against the shipped knowledge documents

use porter_experts::{ExpertCoordinator, ExpertKind, ALTERNATIVES};
use porter_model::{Conflict, ConflictType, DomainType, ExpertOpinion};
use proptest::prelude::*;
use std::path::PathBuf;

fn experts_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../experts")
}

#[tokio::test]
async fn shipped_documents_load_without_fallback() {
    let coordinator = ExpertCoordinator::load(&experts_dir()).await;
    for kind in ExpertKind::ALL {
        let expert = coordinator.get(kind).unwrap();
        assert!(!expert.fallback, "{kind} fell back");
        assert!(!expert.knowledge.patterns.is_empty());
        assert!(!expert.rules.is_empty());
    }
}

#[tokio::test]
async fn missing_directory_falls_back_for_every_expert() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config-pattern-expert.md"), "no sections\n").unwrap();

    let coordinator = ExpertCoordinator::load(dir.path()).await;
    assert!(coordinator.experts().all(|e| e.fallback));
}

#[tokio::test]
async fn two_confident_experts_reach_consensus() {
    let coordinator = ExpertCoordinator::load(&experts_dir()).await;
    let conflict = Conflict::new(
        ConflictType::MissingRequiredMember,
        DomainType::PythonLoadApi,
        "loadapi/StoreLoadApi.py",
        "StoreLoadApi declares no MASTER_HEADER column list",
    )
    .critical();

    let resolution = coordinator.resolve(&conflict);

    assert_eq!(
        resolution.contributing_experts,
        vec!["LoadAPI Pattern Expert".to_string(), "MFP Pattern Expert".to_string()]
    );
    assert!((resolution.confidence - 1.0).abs() < 1e-9);
    assert!(resolution.recommendation.starts_with("Consensus recommendation:"));
    assert!(!resolution.manual_resolution_required);
    assert_eq!(resolution.alternatives, ALTERNATIVES.to_vec());

    let record = &coordinator.history()[0];
    assert!(record.opinions.iter().all(|o| o.alternatives.len() == ALTERNATIVES.len()));
    assert_eq!(record.experts.len(), 4);
    assert_eq!(record.opinions.len(), 4);
}

fn opinion() -> impl Strategy<Value = ExpertOpinion> {
    ("[A-D]", "(fix|add|register) (the|a) (module|loader)", 0.0..=1.0_f64)
        .prop_map(|(name, rec, confidence)| ExpertOpinion::new(name, rec, "r", confidence))
}

proptest! {
    #[test]
    fn synthesis_ignores_opinion_order(
        opinions in prop::collection::vec(opinion(), 0..6),
        seed in any::<u64>(),
    ) {
        let conflict = Conflict::new(
            ConflictType::PatternMismatch,
            DomainType::JavaAlgorithm,
            "src/StoreModule.java",
            "parent differs",
        );
        let mut shuffled = opinions.clone();
        let len = shuffled.len().max(1);
        shuffled.rotate_left((seed as usize) % len);
        shuffled.reverse();

        let a = porter_experts::synthesize(&conflict, opinions);
        let b = porter_experts::synthesize(&conflict, shuffled);
        prop_assert_eq!(&a.recommendation, &b.recommendation);
        prop_assert_eq!(&a.contributing_experts, &b.contributing_experts);
        prop_assert!((a.confidence - b.confidence).abs() < 1e-12);
        prop_assert!((0.0..=1.0).contains(&a.confidence));
    }
}
