use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::scoring::SurveyResponse;

/// All responses submitted by one learner, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnerResponses {
    pub learner: String,
    pub responses: Vec<SurveyResponse>,
}

#[derive(Debug, thiserror::Error)]
pub enum ResponseImportError {
    #[error("failed to read response export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid response CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row} has a blank learner id")]
    BlankLearner { row: usize },
}

#[derive(Debug, Deserialize)]
struct ResponseRow {
    learner: String,
    question_id: String,
    option_index: usize,
}

pub fn parse_responses_path<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<LearnerResponses>, ResponseImportError> {
    let file = std::fs::File::open(path)?;
    parse_responses(file)
}

/// Parse a `learner,question_id,option_index` export, grouping rows per learner in
/// first-seen order.
pub fn parse_responses<R: Read>(reader: R) -> Result<Vec<LearnerResponses>, ResponseImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut grouped: Vec<LearnerResponses> = Vec::new();

    for (index, record) in csv_reader.deserialize::<ResponseRow>().enumerate() {
        let row = record?;
        if row.learner.is_empty() {
            // header is line 1
            return Err(ResponseImportError::BlankLearner { row: index + 2 });
        }

        let response = SurveyResponse::new(row.question_id, row.option_index);
        match grouped.iter_mut().find(|entry| entry.learner == row.learner) {
            Some(entry) => entry.responses.push(response),
            None => grouped.push(LearnerResponses {
                learner: row.learner,
                responses: vec![response],
            }),
        }
    }

    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn groups_rows_by_learner_in_first_seen_order() {
        let csv = "learner,question_id,option_index\n\
                   maya, q1 ,4\n\
                   theo,q1,0\n\
                   maya,q2,1\n";
        let parsed = parse_responses(Cursor::new(csv)).expect("csv parses");

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].learner, "maya");
        assert_eq!(
            parsed[0].responses,
            vec![SurveyResponse::new("q1", 4), SurveyResponse::new("q2", 1)]
        );
        assert_eq!(parsed[1].learner, "theo");
    }

    #[test]
    fn blank_learner_is_rejected_with_row_number() {
        let csv = "learner,question_id,option_index\nmaya,q1,0\n ,q2,1\n";
        let error = parse_responses(Cursor::new(csv)).expect_err("blank learner rejected");
        assert!(matches!(error, ResponseImportError::BlankLearner { row: 3 }));
    }

    #[test]
    fn non_numeric_option_index_is_a_csv_error() {
        let csv = "learner,question_id,option_index\nmaya,q1,first\n";
        let error = parse_responses(Cursor::new(csv)).expect_err("bad index rejected");
        assert!(matches!(error, ResponseImportError::Csv(_)));
    }
}
