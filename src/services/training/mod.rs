use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ndarray::Array2;
use serde::Serialize;
use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::algorithms::encoder::{Encoders, LabelEncoder};
use crate::algorithms::similarity::cosine_similarity_matrix;
use crate::algorithms::CollaborativeFiltering;
use crate::artifacts::ArtifactSet;
use crate::config::Config;
use crate::error::{DatasetError, TrainingError};
use crate::models::{InteractionEvent, RawInteractionRecord};
use crate::utils::metrics::{EvaluationReport, MetricsCalculator};
use crate::utils::validation::{normalize_video_id, UserId};

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub events: usize,
    pub users: usize,
    pub videos: usize,
    pub first_event: NaiveDateTime,
    pub last_event: NaiveDateTime,
    pub evaluation: EvaluationReport,
}

pub struct TrainingService {
    config: Arc<Config>,
}

impl TrainingService {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Load, train, evaluate and persist. Nothing is written unless every
    /// step before the save succeeded.
    pub fn run(&self) -> Result<TrainingReport, TrainingError> {
        let dataset_path = &self.config.training.dataset_path;
        info!("Loading dataset from {}", dataset_path.display());
        let events = load_dataset(dataset_path)?;

        let (first_event, last_event) = timestamp_span(&events).ok_or(DatasetError::Empty)?;
        info!(
            events = events.len(),
            %first_event,
            %last_event,
            "Dataset loaded successfully"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.training.threads)
            .build()?;
        let artifacts = pool.install(|| train(&events))?;

        let model = CollaborativeFiltering::new(
            Arc::new(artifacts),
            self.config.recommendation.neighbors,
        );

        let evaluation = evaluate(
            &events,
            &model,
            self.config.training.eval_sample_users,
            self.config.training.eval_k,
        );
        info!(
            k = evaluation.k,
            users = evaluation.users_evaluated,
            "Average Precision@{}: {:.4}",
            evaluation.k,
            evaluation.mean_precision_at_k
        );

        model.artifacts().save(&self.config.artifacts)?;

        if let Some(sample) = events.first().map(|e| e.user_id) {
            let videos = model
                .rank_user(sample, self.config.recommendation.default_top_k)
                .map(|ranking| ranking.video_ids())
                .unwrap_or_default();
            info!(user = %sample, ?videos, "Sample recommendation");
        }

        Ok(TrainingReport {
            events: events.len(),
            users: model.artifacts().num_users(),
            videos: model.artifacts().num_videos(),
            first_event,
            last_event,
            evaluation,
        })
    }
}

pub fn load_dataset(path: &Path) -> Result<Vec<InteractionEvent>, DatasetError> {
    let file = std::fs::File::open(path)?;
    read_dataset(file)
}

/// Parses interaction rows from CSV with a header line. Unknown columns are
/// ignored; every required column must be present and non-blank on every row.
pub fn read_dataset<R: io::Read>(reader: R) -> Result<Vec<InteractionEvent>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut events = Vec::new();
    for (i, record) in csv_reader.deserialize::<RawInteractionRecord>().enumerate() {
        events.push(parse_record(i + 1, record?)?);
    }

    if events.is_empty() {
        return Err(DatasetError::Empty);
    }

    Ok(events)
}

fn parse_record(row: usize, raw: RawInteractionRecord) -> Result<InteractionEvent, DatasetError> {
    let user_raw = required(row, "user_id", raw.user_id)?;
    let user_id =
        UserId::parse(&user_raw).map_err(|source| DatasetError::InvalidUserId { row, source })?;

    let video_id = required(row, "video_id", raw.video_id)?;
    let video_id = normalize_video_id(&video_id).ok_or(DatasetError::MissingValue {
        row,
        field: "video_id",
    })?;

    let duration_raw = required(row, "watch_duration", raw.watch_duration)?;
    let watch_duration = duration_raw
        .parse::<f32>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| DatasetError::InvalidValue {
            row,
            field: "watch_duration",
            value: duration_raw.clone(),
        })?;

    Ok(InteractionEvent {
        user_id,
        video_id,
        watch_duration,
        liked: parse_flag(row, "liked", raw.liked)?,
        commented: parse_flag(row, "commented", raw.commented)?,
        subscribed_after_watching: parse_flag(
            row,
            "subscribed_after_watching",
            raw.subscribed_after_watching,
        )?,
        timestamp: parse_timestamp(row, raw.timestamp)?,
    })
}

fn required(row: usize, field: &'static str, value: Option<String>) -> Result<String, DatasetError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DatasetError::MissingValue { row, field }),
    }
}

fn parse_flag(row: usize, field: &'static str, value: Option<String>) -> Result<bool, DatasetError> {
    let value = required(row, field, value)?;
    match value.to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "yes" => Ok(true),
        "0" | "0.0" | "false" | "no" => Ok(false),
        _ => Err(DatasetError::InvalidValue { row, field, value }),
    }
}

fn parse_timestamp(row: usize, value: Option<String>) -> Result<NaiveDateTime, DatasetError> {
    let value = required(row, "timestamp", value)?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(&value) {
        return Ok(dt.naive_utc());
    }

    for format in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&value, format) {
            return Ok(dt);
        }
    }

    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or(DatasetError::InvalidValue {
            row,
            field: "timestamp",
            value,
        })
}

fn timestamp_span(events: &[InteractionEvent]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let first = events.iter().map(|e| e.timestamp).min()?;
    let last = events.iter().map(|e| e.timestamp).max()?;
    Some((first, last))
}

/// Builds the full artifact set in memory. The similarity step runs on the
/// caller's rayon pool.
pub fn train(events: &[InteractionEvent]) -> Result<ArtifactSet, TrainingError> {
    if events.is_empty() {
        return Err(DatasetError::Empty.into());
    }

    info!("Encoding users and videos");
    let encoders = Encoders {
        users: LabelEncoder::fit(events.iter().map(|e| e.user_id.to_string())),
        videos: LabelEncoder::fit(events.iter().map(|e| e.video_id.clone())),
    };
    info!(
        users = encoders.users.len(),
        videos = encoders.videos.len(),
        sample_users = ?&encoders.users.classes()[..encoders.users.len().min(5)],
        "Encoded ids"
    );

    info!("Creating interaction matrix");
    let interactions = build_interaction_matrix(events, &encoders);

    info!("Computing user similarity");
    let similarity = cosine_similarity_matrix(&interactions);

    Ok(ArtifactSet::new(interactions, similarity, encoders)?)
}

/// Dense user × video matrix of interaction scores. Repeated (user, video)
/// events are averaged; unobserved cells stay 0.
pub fn build_interaction_matrix(events: &[InteractionEvent], encoders: &Encoders) -> Array2<f32> {
    let shape = (encoders.users.len(), encoders.videos.len());
    let mut sums = Array2::<f32>::zeros(shape);
    let mut counts = Array2::<u32>::zeros(shape);

    for event in events {
        let (Some(row), Some(col)) = (
            encoders.users.transform(&event.user_id.to_string()),
            encoders.videos.transform(&event.video_id),
        ) else {
            warn!(user = %event.user_id, video = %event.video_id, "Event outside of encoders, skipped");
            continue;
        };

        sums[[row, col]] += event.interaction_score();
        counts[[row, col]] += 1;
    }

    sums.zip_mut_with(&counts, |sum, &count| {
        if count > 0 {
            *sum /= count as f32;
        }
    });
    sums
}

/// Precision@k of each sampled user's recommendations against the user's own
/// `k` highest-scored videos. Users are taken in dataset order.
pub fn evaluate(
    events: &[InteractionEvent],
    model: &CollaborativeFiltering,
    sample_users: usize,
    k: usize,
) -> EvaluationReport {
    let calculator = MetricsCalculator::new(k);

    let mut seen = HashSet::new();
    let users: Vec<UserId> = events
        .iter()
        .map(|e| e.user_id)
        .filter(|u| seen.insert(*u))
        .take(sample_users)
        .collect();

    let scores: Vec<f64> = users
        .iter()
        .map(|&user| {
            let mut history: Vec<&InteractionEvent> =
                events.iter().filter(|e| e.user_id == user).collect();
            history.sort_by(|a, b| b.interaction_score().total_cmp(&a.interaction_score()));
            let relevant: Vec<String> = history
                .into_iter()
                .take(k)
                .map(|e| e.video_id.clone())
                .collect();

            let recommended = model
                .rank_user(user, k)
                .map(|ranking| ranking.video_ids())
                .unwrap_or_default();

            calculator.calculate_precision_at_k(&recommended, &relevant)
        })
        .collect();

    EvaluationReport {
        k: calculator.k(),
        users_evaluated: scores.len(),
        mean_precision_at_k: MetricsCalculator::mean(&scores),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "user_id,video_id,watch_duration,liked,commented,subscribed_after_watching,timestamp\n";

    fn dataset(rows: &str) -> String {
        format!("{HEADER}{rows}")
    }

    #[test]
    fn test_read_dataset_normalizes_ids() {
        let csv = dataset(
            "1,V001,80,1,0,0,2024-01-01 10:00:00\n\
             U0001,V002,40,0,1,0,2024-01-02T11:30:00Z\n\
             u2,V001,100,true,false,true,2024-01-03\n",
        );
        let events = read_dataset(csv.as_bytes()).unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].user_id.to_string(), "U0001");
        assert_eq!(events[1].user_id.to_string(), "U0001");
        assert_eq!(events[2].user_id.to_string(), "U0002");
        assert!(events[2].subscribed_after_watching);
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        assert!(matches!(read_dataset(HEADER.as_bytes()), Err(DatasetError::Empty)));
        assert!(matches!(read_dataset("".as_bytes()), Err(DatasetError::Empty)));
    }

    #[test]
    fn test_missing_value_is_rejected() {
        let csv = dataset(
            "U0001,V001,80,1,0,0,2024-01-01 10:00:00\n\
             U0002,V002,,1,0,0,2024-01-01 10:00:00\n",
        );
        let err = read_dataset(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::MissingValue { row: 2, field: "watch_duration" }
        ));
    }

    #[test]
    fn test_missing_column_is_rejected() {
        let csv = "user_id,video_id,watch_duration\nU0001,V001,80\n";
        let err = read_dataset(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DatasetError::MissingValue { row: 1, field: "liked" }));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_flag = dataset("U0001,V001,80,maybe,0,0,2024-01-01\n");
        assert!(matches!(
            read_dataset(bad_flag.as_bytes()),
            Err(DatasetError::InvalidValue { field: "liked", .. })
        ));

        let bad_user = dataset("abc,V001,80,1,0,0,2024-01-01\n");
        assert!(matches!(
            read_dataset(bad_user.as_bytes()),
            Err(DatasetError::InvalidUserId { row: 1, .. })
        ));

        let bad_time = dataset("U0001,V001,80,1,0,0,yesterday\n");
        assert!(matches!(
            read_dataset(bad_time.as_bytes()),
            Err(DatasetError::InvalidValue { field: "timestamp", .. })
        ));
    }

    #[test]
    fn test_duplicate_events_are_averaged() {
        let csv = dataset(
            "U0001,V001,100,1,1,1,2024-01-01\n\
             U0001,V001,0,0,0,0,2024-01-02\n\
             U0002,V002,50,0,0,0,2024-01-02\n",
        );
        let events = read_dataset(csv.as_bytes()).unwrap();
        let artifacts = train(&events).unwrap();
        let m = artifacts.interactions();

        assert_eq!(m.dim(), (2, 2));
        assert!((m[[0, 0]] - 0.5).abs() < 1e-6);
        assert_eq!(m[[0, 1]], 0.0);
        assert!((m[[1, 1]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_train_builds_consistent_artifacts() {
        let csv = dataset(
            "U0001,V001,90,1,0,0,2024-01-01\n\
             U0002,V001,60,0,0,0,2024-01-01\n\
             U0002,V002,30,1,1,0,2024-01-01\n\
             U0003,V003,10,0,0,1,2024-01-01\n",
        );
        let events = read_dataset(csv.as_bytes()).unwrap();
        let artifacts = train(&events).unwrap();

        assert_eq!(artifacts.num_users(), 3);
        assert_eq!(artifacts.num_videos(), 3);
        let sim = artifacts.similarity();
        for i in 0..3 {
            assert_eq!(sim[[i, i]], 1.0);
            for j in 0..3 {
                assert_eq!(sim[[i, j]], sim[[j, i]]);
            }
        }
        assert_eq!(sim[[0, 2]], 0.0);
    }

    #[test]
    fn test_train_rejects_empty_events() {
        assert!(matches!(
            train(&[]),
            Err(TrainingError::Dataset(DatasetError::Empty))
        ));
    }

    #[test]
    fn test_evaluate_reports_sampled_users() {
        let csv = dataset(
            "U0001,V001,90,1,0,0,2024-01-01\n\
             U0002,V001,60,0,0,0,2024-01-01\n\
             U0002,V002,30,1,1,0,2024-01-01\n\
             U0003,V002,10,0,0,1,2024-01-01\n",
        );
        let events = read_dataset(csv.as_bytes()).unwrap();
        let model = CollaborativeFiltering::new(Arc::new(train(&events).unwrap()), 5);

        let report = evaluate(&events, &model, 2, 5);
        assert_eq!(report.k, 5);
        assert_eq!(report.users_evaluated, 2);
        assert!((0.0..=1.0).contains(&report.mean_precision_at_k));
    }

    #[test]
    fn test_run_aborts_before_writing_on_bad_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let dataset_path = dir.path().join("data.csv");
        std::fs::write(&dataset_path, dataset("U0001,V001,,1,0,0,2024-01-01\n")).unwrap();

        let mut config = Config::default();
        config.training.dataset_path = dataset_path;
        config.artifacts = config.artifacts.with_dir(dir.path().join("model"));

        let service = TrainingService::new(Arc::new(config.clone()));
        assert!(matches!(
            service.run(),
            Err(TrainingError::Dataset(DatasetError::MissingValue { .. }))
        ));
        assert!(!config.artifacts.dir.exists());
    }
}
