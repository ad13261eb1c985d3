use crate::core::catalog::{
    self, ACADEMIC_CHAPTERS, ACADEMIC_WRITING_STYLES, BOOK_CHAPTERS, CITATION_STYLES,
    NOVEL_CHAPTERS, NOVEL_WRITING_STYLES, OUTPUT_LANGUAGES, REFERENCE_SOURCES, REFERENCE_TYPES,
    RESEARCH_INSTRUMENTS, SUGGEST_CHAPTER_TITLES,
};
use crate::core::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DocumentKind {
    #[default]
    Skripsi,
    Tesis,
    Disertasi,
    Makalah,
    Buku,
    #[serde(rename = "Buku Pelajaran")]
    BukuPelajaran,
    Khutbah,
    #[serde(rename = "Karya Ilmiah Lain")]
    KaryaIlmiahLain,
    Novel,
    Cerita,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 10] = [
        DocumentKind::Skripsi,
        DocumentKind::Tesis,
        DocumentKind::Disertasi,
        DocumentKind::Makalah,
        DocumentKind::Buku,
        DocumentKind::BukuPelajaran,
        DocumentKind::Khutbah,
        DocumentKind::KaryaIlmiahLain,
        DocumentKind::Novel,
        DocumentKind::Cerita,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Skripsi => "Skripsi",
            DocumentKind::Tesis => "Tesis",
            DocumentKind::Disertasi => "Disertasi",
            DocumentKind::Makalah => "Makalah",
            DocumentKind::Buku => "Buku",
            DocumentKind::BukuPelajaran => "Buku Pelajaran",
            DocumentKind::Khutbah => "Khutbah",
            DocumentKind::KaryaIlmiahLain => "Karya Ilmiah Lain",
            DocumentKind::Novel => "Novel",
            DocumentKind::Cerita => "Cerita",
        }
    }

    pub fn mode(self) -> DocumentMode {
        match self {
            DocumentKind::Novel | DocumentKind::Cerita => DocumentMode::Creative,
            DocumentKind::Buku | DocumentKind::BukuPelajaran => DocumentMode::Book,
            DocumentKind::Khutbah => DocumentMode::Sermon,
            DocumentKind::Skripsi
            | DocumentKind::Tesis
            | DocumentKind::Disertasi
            | DocumentKind::Makalah
            | DocumentKind::KaryaIlmiahLain => DocumentMode::Academic,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Behaviour family of a [`DocumentKind`]. Every place where generation or
/// form handling differs between kinds matches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentMode {
    Academic,
    Book,
    Creative,
    Sermon,
}

impl DocumentMode {
    /// Name used for this mode in stored chapter lists.
    pub fn key(self) -> &'static str {
        match self {
            DocumentMode::Academic => "academic",
            DocumentMode::Book => "book",
            DocumentMode::Creative => "creative",
            DocumentMode::Sermon => "sermon",
        }
    }

    /// Book and creative documents let the user curate their own chapter list.
    pub fn uses_editable_chapters(self) -> bool {
        match self {
            DocumentMode::Book | DocumentMode::Creative => true,
            DocumentMode::Academic | DocumentMode::Sermon => false,
        }
    }

    /// Methodology, variables and instruments only apply to research writing.
    pub fn academic_fields_enabled(self) -> bool {
        match self {
            DocumentMode::Academic => true,
            DocumentMode::Book | DocumentMode::Creative | DocumentMode::Sermon => false,
        }
    }

    pub fn reference_fields_enabled(self) -> bool {
        match self {
            DocumentMode::Creative => false,
            DocumentMode::Academic | DocumentMode::Book | DocumentMode::Sermon => true,
        }
    }

    pub fn writing_styles(self) -> &'static [&'static str] {
        match self {
            DocumentMode::Creative => NOVEL_WRITING_STYLES,
            DocumentMode::Academic | DocumentMode::Book | DocumentMode::Sermon => {
                ACADEMIC_WRITING_STYLES
            }
        }
    }

    pub fn default_chapters(self) -> &'static [&'static str] {
        match self {
            DocumentMode::Creative => NOVEL_CHAPTERS,
            DocumentMode::Book => BOOK_CHAPTERS,
            DocumentMode::Academic | DocumentMode::Sermon => ACADEMIC_CHAPTERS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ResearchMethod {
    #[default]
    Kualitatif,
    Kuantitatif,
    #[serde(rename = "Metode Campuran")]
    Campuran,
}

impl fmt::Display for ResearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResearchMethod::Kualitatif => "Kualitatif",
            ResearchMethod::Kuantitatif => "Kuantitatif",
            ResearchMethod::Campuran => "Metode Campuran",
        };
        f.write_str(label)
    }
}

/// Everything the user chose for one generation run.
///
/// Serialized with the same keys the form state has always been stored
/// under, so saved sessions stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentConfiguration {
    #[serde(rename = "researchType")]
    pub kind: DocumentKind,
    pub title: String,
    pub topic_description: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(rename = "jurusan")]
    pub major: String,
    #[serde(rename = "programStudi")]
    pub study_program: String,
    pub research_method: ResearchMethod,
    #[serde(default)]
    pub variables: String,
    pub reference_count: u32,
    pub page_count: u32,
    #[serde(default)]
    pub start_year: String,
    #[serde(default)]
    pub end_year: String,
    #[serde(default)]
    pub selected_chapters: Vec<String>,
    #[serde(default)]
    pub chapter_page_counts: BTreeMap<String, u32>,
    #[serde(default)]
    pub chapter_reference_counts: BTreeMap<String, u32>,
    pub citation_style: String,
    pub reference_source: String,
    pub reference_type: String,
    #[serde(default)]
    pub research_instruments: Vec<String>,
    pub writing_style: String,
    pub output_language: String,
}

const DEFAULT_PAGE_COUNT: u32 = 5;
const DEFAULT_REFERENCE_COUNT: u32 = 10;

impl Default for DocumentConfiguration {
    fn default() -> Self {
        let major = catalog::majors().next().unwrap_or_default().to_string();
        let study_program = catalog::programs_for(&major)
            .first()
            .copied()
            .unwrap_or_default()
            .to_string();
        let first_chapter = ACADEMIC_CHAPTERS[0].to_string();

        Self {
            kind: DocumentKind::Skripsi,
            title: String::new(),
            topic_description: String::new(),
            synopsis: String::new(),
            major,
            study_program,
            research_method: ResearchMethod::Kualitatif,
            variables: String::new(),
            reference_count: DEFAULT_REFERENCE_COUNT,
            page_count: DEFAULT_PAGE_COUNT,
            start_year: String::new(),
            end_year: String::new(),
            selected_chapters: vec![first_chapter.clone()],
            chapter_page_counts: BTreeMap::from([(first_chapter.clone(), DEFAULT_PAGE_COUNT)]),
            chapter_reference_counts: BTreeMap::from([(first_chapter, DEFAULT_REFERENCE_COUNT)]),
            citation_style: "APA".to_string(),
            reference_source: catalog::REFERENCE_SOURCE_SCHOLAR.to_string(),
            reference_type: "In-text citation".to_string(),
            research_instruments: Vec::new(),
            writing_style: "Akademisi".to_string(),
            output_language: "Indonesia".to_string(),
        }
    }
}

impl DocumentConfiguration {
    pub fn mode(&self) -> DocumentMode {
        self.kind.mode()
    }

    pub fn page_count_for(&self, chapter: &str) -> u32 {
        match self.chapter_page_counts.get(chapter) {
            Some(&n) if n > 0 => n,
            _ => self.page_count,
        }
    }

    pub fn reference_count_for(&self, chapter: &str) -> u32 {
        match self.chapter_reference_counts.get(chapter) {
            Some(&n) if n > 0 => n,
            _ => self.reference_count,
        }
    }

    /// Whether the chapter calls should ask the service for web citations.
    pub fn wants_grounding(&self) -> bool {
        let searchable = self.reference_source == catalog::REFERENCE_SOURCE_SEARCH
            || self.reference_source == catalog::REFERENCE_SOURCE_SCHOLAR;
        searchable && self.mode() != DocumentMode::Creative
    }

    pub fn is_suggestion_request(&self) -> bool {
        self.selected_chapters.len() == 1 && self.selected_chapters[0] == SUGGEST_CHAPTER_TITLES
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.selected_chapters.is_empty() {
            return Err(ValidationError::NoChapters);
        }
        if self.selected_chapters.len() > 1
            && self.selected_chapters.iter().any(|c| c == SUGGEST_CHAPTER_TITLES)
        {
            return Err(ValidationError::SuggestionMustBeAlone(
                SUGGEST_CHAPTER_TITLES.to_string(),
            ));
        }
        known_option("citation style", &self.citation_style, CITATION_STYLES)?;
        known_option("reference type", &self.reference_type, REFERENCE_TYPES)?;
        known_option("reference source", &self.reference_source, REFERENCE_SOURCES)?;
        known_option("output language", &self.output_language, OUTPUT_LANGUAGES)?;
        if !ACADEMIC_WRITING_STYLES.contains(&self.writing_style.as_str()) {
            known_option("writing style", &self.writing_style, NOVEL_WRITING_STYLES)?;
        }
        for instrument in &self.research_instruments {
            known_option("research instrument", instrument, RESEARCH_INSTRUMENTS)?;
        }
        Ok(())
    }

    pub fn is_selected(&self, chapter: &str) -> bool {
        self.selected_chapters.iter().any(|c| c == chapter)
    }

    pub fn select_chapter(&mut self, chapter: &str) {
        if !self.is_selected(chapter) {
            self.selected_chapters.push(chapter.to_string());
        }
        self.seed_counts(chapter);
    }

    pub fn deselect_chapter(&mut self, chapter: &str) {
        self.selected_chapters.retain(|c| c != chapter);
    }

    /// Selects every chapter of `chapters` except the title-suggestion entry.
    pub fn select_all(&mut self, chapters: &ChapterList) {
        self.selected_chapters = chapters
            .iter()
            .filter(|c| *c != SUGGEST_CHAPTER_TITLES)
            .map(str::to_string)
            .collect();
        for chapter in self.selected_chapters.clone() {
            self.seed_counts(&chapter);
        }
    }

    pub fn deselect_all(&mut self) {
        self.selected_chapters.clear();
    }

    fn seed_counts(&mut self, chapter: &str) {
        self.chapter_page_counts
            .entry(chapter.to_string())
            .or_insert(self.page_count);
        self.chapter_reference_counts
            .entry(chapter.to_string())
            .or_insert(self.reference_count);
    }

    /// Switching to a kind of another mode drops the selection, since the
    /// chapter names of one mode mean nothing in another. A writing style the
    /// new mode does not offer is replaced by its first one.
    pub fn set_kind(&mut self, kind: DocumentKind) {
        let previous = self.mode();
        self.kind = kind;
        if previous != kind.mode() {
            self.selected_chapters.clear();
        }
        let styles = kind.mode().writing_styles();
        if !styles.contains(&self.writing_style.as_str()) {
            if let Some(first) = styles.first() {
                self.writing_style = first.to_string();
            }
        }
    }

    pub fn set_major(&mut self, major: &str) {
        self.major = major.to_string();
        self.study_program = catalog::programs_for(major)
            .first()
            .copied()
            .unwrap_or_default()
            .to_string();
    }

    pub fn toggle_instrument(&mut self, instrument: &str, enabled: bool) {
        let present = self.research_instruments.iter().any(|i| i == instrument);
        if enabled && !present {
            self.research_instruments.push(instrument.to_string());
        } else if !enabled {
            self.research_instruments.retain(|i| i != instrument);
        }
    }

    /// Keeps the selection and the per-chapter counts in step with a rename.
    pub fn rename_selected(&mut self, old: &str, new: &str) {
        for chapter in self.selected_chapters.iter_mut() {
            if chapter == old {
                *chapter = new.to_string();
            }
        }
        if let Some(pages) = self.chapter_page_counts.remove(old) {
            self.chapter_page_counts.insert(new.to_string(), pages);
        }
        if let Some(references) = self.chapter_reference_counts.remove(old) {
            self.chapter_reference_counts.insert(new.to_string(), references);
        }
    }

    /// Drops a removed chapter from the selection and the per-chapter counts.
    pub fn forget_chapter(&mut self, chapter: &str) {
        self.deselect_chapter(chapter);
        self.chapter_page_counts.remove(chapter);
        self.chapter_reference_counts.remove(chapter);
    }
}

fn known_option(
    field: &'static str,
    value: &str,
    options: &[&str],
) -> Result<(), ValidationError> {
    if options.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::UnknownOption {
            field,
            value: value.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChapterListError {
    #[error("chapter name must not be empty")]
    EmptyName,
    #[error("a chapter named '{0}' already exists")]
    Duplicate(String),
    #[error("chapter '{0}' not found")]
    NotFound(String),
    #[error("'{0}' cannot be edited or removed")]
    Protected(String),
    #[error("new order does not contain the same chapters")]
    MembershipChanged,
}

/// Ordered chapter names, unique ignoring case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ChapterList(Vec<String>);

impl ChapterList {
    pub fn defaults(mode: DocumentMode) -> Self {
        Self(mode.default_chapters().iter().map(|c| c.to_string()).collect())
    }

    /// Builds a list from stored names, dropping case-insensitive repeats.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::default();
        for name in names {
            let name = name.into();
            if !list.contains(&name) {
                list.0.push(name);
            }
        }
        list
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, name: &str) -> bool {
        let needle = name.trim().to_lowercase();
        self.0.iter().any(|c| c.trim().to_lowercase() == needle)
    }

    /// Appends a chapter and returns the stored (trimmed) name.
    pub fn add(&mut self, name: &str) -> Result<String, ChapterListError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChapterListError::EmptyName);
        }
        if self.contains(name) {
            return Err(ChapterListError::Duplicate(name.to_string()));
        }
        self.0.push(name.to_string());
        Ok(name.to_string())
    }

    /// Renames `old`. Returns `Ok(None)` when the new name only differs in case.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<Option<String>, ChapterListError> {
        if old == SUGGEST_CHAPTER_TITLES {
            return Err(ChapterListError::Protected(old.to_string()));
        }
        let new = new.trim();
        if new.is_empty() {
            return Err(ChapterListError::EmptyName);
        }
        let index = self
            .0
            .iter()
            .position(|c| c == old)
            .ok_or_else(|| ChapterListError::NotFound(old.to_string()))?;
        if new.to_lowercase() == old.to_lowercase() {
            return Ok(None);
        }
        if self.contains(new) {
            return Err(ChapterListError::Duplicate(new.to_string()));
        }
        self.0[index] = new.to_string();
        Ok(Some(new.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Result<(), ChapterListError> {
        if name == SUGGEST_CHAPTER_TITLES {
            return Err(ChapterListError::Protected(name.to_string()));
        }
        let before = self.0.len();
        self.0.retain(|c| c != name);
        if self.0.len() == before {
            return Err(ChapterListError::NotFound(name.to_string()));
        }
        Ok(())
    }

    /// Replaces the order. The new order must hold exactly the same chapters.
    pub fn reorder(&mut self, order: Vec<String>) -> Result<(), ChapterListError> {
        let mut current = self.0.clone();
        let mut proposed = order.clone();
        current.sort();
        proposed.sort();
        if current != proposed {
            return Err(ChapterListError::MembershipChanged);
        }
        self.0 = order;
        Ok(())
    }

    /// The number to offer for the next `Bab N` chapter.
    pub fn next_chapter_number(&self) -> u32 {
        self.0
            .iter()
            .filter_map(|c| chapter_number(c))
            .max()
            .unwrap_or(0)
            .saturating_add(1)
    }

    /// The list order restricted to `selected`.
    pub fn ordered_selection(&self, selected: &[String]) -> Vec<String> {
        self.0
            .iter()
            .filter(|c| selected.iter().any(|s| s == *c))
            .cloned()
            .collect()
    }
}

/// Parses the number out of names like `Bab 3`, `Chapter 12: Title`.
fn chapter_number(name: &str) -> Option<u32> {
    let lower = name.trim_start().to_lowercase();
    let rest = lower
        .strip_prefix("bab")
        .or_else(|| lower.strip_prefix("chapter"))?;
    let digits: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok().filter(|n| *n > 0)
}
