//! End-to-end checks of the batch pipeline on synthetic batches.

use season_tracker::domain::{Season, SeasonKey};
use season_tracker::models::{RawRecord, RawTag, Record, RecordDetails};
use season_tracker::pipeline::{
    GenreTables, HeuristicTables, OriginPolicyKind, PipelineConfig, Thresholds, deduplicate,
    process_batch, threshold,
};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn raw(id: Option<i64>) -> RawRecord {
    RawRecord {
        id,
        title: format!("title {id:?}"),
        ..RawRecord::default()
    }
}

fn record(id: i64, japanese: bool, kid: bool, score: Option<f64>, members: Option<i64>) -> Record {
    Record {
        id,
        title: format!("title {id}"),
        title_native: None,
        synonyms: vec![],
        score,
        members,
        popularity: None,
        genres: vec![],
        studios: vec![],
        producers: vec![],
        licensors: vec![],
        demographics: vec![],
        year: 2024,
        season: Season::Spring,
        is_japanese: japanese,
        is_adult: false,
        is_kid: kid,
        details: RecordDetails::default(),
    }
}

fn config(policy: OriginPolicyKind) -> PipelineConfig {
    PipelineConfig {
        policy,
        normalize_tags: policy == OriginPolicyKind::KanaDetection,
        allowed_formats: vec![],
        heuristics: HeuristicTables::default(),
        genres: GenreTables::default(),
    }
}

const KEY: SeasonKey = SeasonKey::new(2024, Season::Spring);

#[test]
fn test_dedup_drops_repeats_and_missing_ids() {
    let batch = vec![raw(Some(1)), raw(Some(2)), raw(Some(2)), raw(Some(3)), raw(None)];

    let (kept, report) = deduplicate(batch);

    let ids: Vec<Option<i64>> = kept.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.missing_id, 1);
}

#[test]
fn test_dedup_is_a_fixed_point() {
    let batch = vec![raw(Some(5)), raw(Some(1)), raw(Some(5)), raw(Some(9)), raw(Some(1))];

    let (once, _) = deduplicate(batch);
    let (twice, report) = deduplicate(once.clone());

    assert_eq!(once, twice);
    assert_eq!(report.removed(), 0);
    let ids: Vec<Option<i64>> = once.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![Some(5), Some(1), Some(9)]);
}

#[test]
fn test_kana_title_from_japanese_studio_is_japanese_under_both_policies() {
    for policy in [OriginPolicyKind::StudioAllowList, OriginPolicyKind::KanaDetection] {
        let entry = RawRecord {
            id: Some(1),
            title: "Kimetsu no Yaiba".to_string(),
            title_native: Some("鬼滅の刃".to_string()),
            studios: strings(&["MAPPA"]),
            ..RawRecord::default()
        };

        let outcome = process_batch(vec![entry], KEY, &config(policy));

        assert_eq!(outcome.records.len(), 1, "{policy:?}");
        assert!(outcome.records[0].is_japanese, "{policy:?}");
    }
}

#[test]
fn test_chinese_producer_without_kana_is_foreign_under_both_policies() {
    let entry = RawRecord {
        id: Some(2),
        title: "Some Donghua".to_string(),
        title_native: Some("天官赐福".to_string()),
        producers: strings(&["Tencent"]),
        ..RawRecord::default()
    };

    let allow_list = process_batch(
        vec![entry.clone()],
        KEY,
        &config(OriginPolicyKind::StudioAllowList),
    );
    assert!(!allow_list.records[0].is_japanese);

    // alone in its batch, the record is its own reference set
    let kana = process_batch(vec![entry], KEY, &config(OriginPolicyKind::KanaDetection));
    assert_eq!(kana.records.len(), 1);
    assert!(!kana.records[0].is_japanese);
}

#[test]
fn test_adding_japanese_studio_never_flips_to_foreign() {
    let policy = OriginPolicyKind::StudioAllowList;
    let producer_sets = [vec![], strings(&["Tencent"]), strings(&["Aniplex"])];

    for producers in producer_sets {
        let base = RawRecord {
            id: Some(3),
            producers: producers.clone(),
            ..RawRecord::default()
        };
        let with_studio = RawRecord {
            studios: strings(&["Madhouse"]),
            ..base.clone()
        };

        let before = process_batch(vec![base], KEY, &config(policy)).records[0].is_japanese;
        let after = process_batch(vec![with_studio], KEY, &config(policy)).records[0].is_japanese;

        assert!(after, "{producers:?}");
        assert!(!before || after);
    }
}

#[test]
fn test_threshold_reference_scenario() {
    let core = [
        record(1, true, false, Some(8.0), Some(100)),
        record(2, true, false, Some(7.0), Some(300)),
        record(3, true, false, Some(9.0), Some(200)),
    ];

    let thresholds = Thresholds::from_reference(core.iter());
    assert!((thresholds.score - 7.0).abs() < f64::EPSILON);
    assert_eq!(thresholds.members, 200);

    let suspect = record(4, false, false, Some(6.5), Some(250));
    assert!(thresholds.admits(&suspect));
}

#[test]
fn test_threshold_filter_keeps_every_core_record() {
    let batch = vec![
        record(1, true, false, Some(9.0), Some(50_000)),
        record(2, true, false, None, None),
        record(3, false, false, Some(2.0), Some(10)),
        record(4, true, true, Some(1.0), Some(5)),
        record(5, true, false, Some(3.0), Some(1)),
    ];

    let (kept, report) = threshold::apply(batch);

    let ids: Vec<i64> = kept.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 5]);
    assert_eq!(report.core, 3);
    assert_eq!(report.dropped, 2);
}

#[test]
fn test_threshold_without_scores_defaults_to_zero() {
    let batch = vec![
        record(1, true, false, None, Some(100)),
        record(2, true, false, None, Some(300)),
        record(3, false, false, None, Some(300)),
        record(4, false, false, None, Some(50)),
    ];

    let (kept, report) = threshold::apply(batch);

    assert!(report.thresholds.score.abs() < f64::EPSILON);
    assert_eq!(report.thresholds.members, 300);
    // missing scores compare as 0 against a 0 threshold
    assert_eq!(kept.len(), 4);
}

#[test]
fn test_bangumi_style_batch_is_normalized_and_filtered() {
    let japanese = RawRecord {
        id: Some(10),
        title: "轻音少女".to_string(),
        title_native: Some("けいおん!".to_string()),
        score: Some(8.0),
        members: Some(5000),
        tags: vec![RawTag::new("音乐", 40), RawTag::new("日常", 30), RawTag::new("2009", 99)],
        ..RawRecord::default()
    };
    let obscure = RawRecord {
        id: Some(11),
        title: "Obscure".to_string(),
        title_native: Some("无名".to_string()),
        score: Some(5.0),
        members: Some(10),
        ..RawRecord::default()
    };
    let popular = RawRecord {
        id: Some(12),
        title: "Popular".to_string(),
        title_native: Some("热门".to_string()),
        score: Some(7.5),
        members: Some(20),
        ..RawRecord::default()
    };

    let outcome = process_batch(
        vec![japanese, obscure, popular],
        KEY,
        &config(OriginPolicyKind::KanaDetection),
    );

    let ids: Vec<i64> = outcome.records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![10, 12]);
    assert_eq!(outcome.records[0].genres, strings(&["日常", "音乐"]));
    assert_eq!(outcome.filter.map(|f| f.dropped), Some(1));
}

#[test]
fn test_bangumi_children_tag_keeps_title_out_of_core() {
    let anchor = RawRecord {
        id: Some(20),
        title: "摇曳露营".to_string(),
        title_native: Some("ゆるキャン△".to_string()),
        score: Some(8.0),
        members: Some(5000),
        tags: vec![RawTag::new("日常", 50)],
        ..RawRecord::default()
    };
    let children = RawRecord {
        id: Some(21),
        title: "光之美少女".to_string(),
        title_native: Some("プリキュア".to_string()),
        score: Some(6.0),
        members: Some(9000),
        tags: vec![RawTag::new("儿童", 500), RawTag::new("子供向け", 100)],
        ..RawRecord::default()
    };

    let outcome = process_batch(
        vec![anchor, children],
        KEY,
        &config(OriginPolicyKind::KanaDetection),
    );

    let filter = outcome.filter.unwrap();
    assert_eq!(filter.core, 1);
    assert_eq!(filter.suspects, 1);

    let kid = outcome.records.iter().find(|r| r.id == 21).unwrap();
    assert!(kid.is_japanese);
    assert!(kid.is_kid);
}
