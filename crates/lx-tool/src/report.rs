use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub name: String,
    pub reference: String,
    pub failures: Vec<String>,
    /// Rendered execution log of the last run, kept for failed scenarios.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<String>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file: String,
    /// Problems that belong to the file rather than to one scenario.
    pub failures: Vec<String>,
    pub scenarios: Vec<ScenarioReport>,
}

impl FileReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty() && self.scenarios.iter().all(ScenarioReport::passed)
    }

    pub fn failed_scenarios(&self) -> impl Iterator<Item = &ScenarioReport> {
        self.scenarios.iter().filter(|scenario| !scenario.passed())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    pub files: Vec<FileReport>,
}

impl TestReport {
    pub fn passed(&self) -> bool {
        self.files.iter().all(FileReport::passed)
    }

    pub fn scenario_count(&self) -> usize {
        self.files.iter().map(|file| file.scenarios.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.files
            .iter()
            .map(|file| file.failed_scenarios().count())
            .sum()
    }

    /// One line per file problem and failed scenario.
    pub fn failure_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for file in &self.files {
            for failure in &file.failures {
                lines.push(format!("{}: {}", file.file, failure));
            }
            for scenario in file.failed_scenarios() {
                for failure in &scenario.failures {
                    lines.push(format!("{} {}: {}", scenario.reference, scenario.name, failure));
                }
            }
        }
        lines
    }
}

#[cfg(test)]
mod report_tests {
    use super::*;

    fn scenario(name: &str, failures: &[&str]) -> ScenarioReport {
        ScenarioReport {
            name: name.to_string(),
            reference: "a.lexy(1, 1)".to_string(),
            failures: failures.iter().map(|failure| failure.to_string()).collect(),
            log: Vec::new(),
        }
    }

    #[test]
    fn counts_and_failure_lines_cover_files_and_scenarios() {
        let report = TestReport {
            files: vec![FileReport {
                file: "a.lexy".to_string(),
                failures: vec!["root".to_string()],
                scenarios: vec![scenario("Ok", &[]), scenario("Broken", &["wrong"])],
            }],
        };
        assert!(!report.passed());
        assert_eq!(report.scenario_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(
            report.failure_lines(),
            vec![
                "a.lexy: root".to_string(),
                "a.lexy(1, 1) Broken: wrong".to_string()
            ]
        );
    }

    #[test]
    fn serializes_camel_case_and_skips_empty_logs() {
        let json = serde_json::to_string(&scenario("Ok", &[])).expect("serialize");
        assert_eq!(json, r#"{"name":"Ok","reference":"a.lexy(1, 1)","failures":[]}"#);
    }
}
