use std::{
    fmt,
    fs::File,
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use creditlens_engine::ApplicantRecord;

use crate::schema::{bundle::ModelBundle, config::AppConfig};

#[derive(Debug)]
pub enum Output {
    Stdout {
        writer: StdoutLock<'static>,
    },
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = Output::from_output_path(output_path)?;
        output.write_json(value)
    }

    pub fn save_text<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: fmt::Display,
    {
        let mut output = Output::from_output_path(output_path)?;
        output.write_text(value)
    }

    pub fn from_output_path(output_path: Option<PathBuf>) -> anyhow::Result<Self> {
        match output_path {
            Some(path) => Output::open(path),
            None => Ok(Output::stdout()),
        }
    }

    pub fn stdout() -> Self {
        Output::Stdout {
            writer: io::stdout().lock(),
        }
    }

    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn display_path(&self) -> String {
        match self {
            Output::Stdout { .. } => "stdout".to_string(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn write_json<T>(&mut self, value: T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        serde_json::to_writer_pretty(&mut *self, &value)
            .with_context(|| format!("Failed to write JSON to {}", self.display_path()))?;
        writeln!(&mut *self).with_context(|| {
            format!(
                "Failed to write newline after JSON to {}",
                self.display_path()
            )
        })?;
        self.flush()
            .with_context(|| format!("Failed to flush output to {}", self.display_path()))?;
        Ok(())
    }

    pub fn write_text<T>(&mut self, value: &T) -> anyhow::Result<()>
    where
        T: fmt::Display,
    {
        write!(&mut *self, "{value}")
            .with_context(|| format!("Failed to write text to {}", self.display_path()))?;
        self.flush()
            .with_context(|| format!("Failed to flush output to {}", self.display_path()))?;
        Ok(())
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout { writer } => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout { writer } => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

/// Read a model bundle (metadata, optional catalog, linear model)
pub fn read_bundle_file<P>(path: P) -> anyhow::Result<ModelBundle>
where
    P: AsRef<Path>,
{
    read_json_file("model bundle", path)
}

/// Read a single applicant record
pub fn read_applicant_file<P>(path: P) -> anyhow::Result<ApplicantRecord>
where
    P: AsRef<Path>,
{
    read_json_file("applicant", path)
}

/// Read a population as a JSON array of applicant records
pub fn read_population_file<P>(path: P) -> anyhow::Result<Vec<ApplicantRecord>>
where
    P: AsRef<Path>,
{
    let population: Vec<ApplicantRecord> = read_json_file("population", path.as_ref())?;
    if population.is_empty() {
        anyhow::bail!(
            "Population file contains no applicants: {}",
            path.as_ref().display()
        );
    }
    Ok(population)
}

/// Read the configuration file, or the defaults when no file is given
pub fn read_config_file(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => read_json_file("config", path),
        None => Ok(AppConfig::default()),
    }
}
