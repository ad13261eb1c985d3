// Fixed option lists offered to the user. Names are the product's own labels
// and double as chapter keys in persisted state.

/// Selecting this entry asks for chapter title ideas instead of content.
pub const SUGGEST_CHAPTER_TITLES: &str = "Sarankan Judul Bab";

pub const ACADEMIC_CHAPTERS: &[&str] = &[
    "Bab 1: Pendahuluan",
    "Bab 2: Kajian Pustaka",
    "Bab 3: Metodologi Penelitian",
    "Bab 4: Hasil dan Pembahasan",
    "Bab 5: Kesimpulan dan Saran",
    "Outline",
    "Abstrak",
    "Daftar Isi",
    "Daftar Pustaka",
];

pub const BOOK_CHAPTERS: &[&str] = &[
    "Outline",
    "Daftar Isi",
    "Kata Pengantar",
    SUGGEST_CHAPTER_TITLES,
    "Bab 1",
    "Bab 2",
    "Bab 3",
    "Bab 4",
    "Bab 5",
    "Bab 6",
    "Bab 7",
    "Bab 8",
    "Bab 9",
    "Bab 10",
    "Daftar Pustaka",
];

pub const NOVEL_CHAPTERS: &[&str] = &[
    "Sinopsis",
    SUGGEST_CHAPTER_TITLES,
    "Prolog",
    "Bab 1",
    "Bab 2",
    "Bab 3",
    "Bab 4",
    "Bab 5",
    "Bab 6",
    "Bab 7",
    "Bab 8",
    "Bab 9",
    "Bab 10",
    "Bab 11",
    "Bab 12",
    "Bab 13",
    "Bab 14",
    "Bab 15",
    "Biografi Penulis",
    "Epilog",
];

pub const CITATION_STYLES: &[&str] = &[
    "APA", "MLA", "Chicago", "IEEE", "Harvard", "Turabian", "Vancouver", "CSE", "AMA", "ASA",
];

pub const REFERENCE_TYPES: &[&str] = &["In-text citation", "Footnote"];

pub const REFERENCE_SOURCE_SEARCH: &str = "Google Search";
pub const REFERENCE_SOURCE_SCHOLAR: &str = "Google Scholar";
pub const REFERENCE_SOURCES: &[&str] = &[REFERENCE_SOURCE_SCHOLAR, REFERENCE_SOURCE_SEARCH];

pub const ACADEMIC_WRITING_STYLES: &[&str] = &[
    "Akademisi",
    "Dosen",
    "Profesional",
    "Mahasiswa",
    "Guru",
    "Siswa",
];

pub const NOVEL_WRITING_STYLES: &[&str] = &[
    "Asma Nadia",
    "Tere Liye",
    "Andrea Hirata",
    "Eka Kurniawan",
    "Haidar Musyafa",
    "Pramoedya Ananta Toer",
    "Ahmad Fuadi",
    "Ilana Tan",
    "Dewi Lestari (Dee)",
    "Raditya Dika",
    "Nh. Dini",
    "Winna Efendi",
    "Ika Natassa",
    "Valerie Patkar",
    "Leila S. Chudori",
    "Sapardi Djoko Damono",
    "Pidi Baiq",
    "Ayu Utami",
    "Habiburrahman El Siradji",
    "Gaya Bahasa Betawi",
    "Gaya Bahasa Fiksi",
    "Gaya Bahasa Indonesia-Sunda",
    "Gaya Bahasa Indonesia-Jawa",
];

pub const OUTPUT_LANGUAGES: &[&str] = &[
    "Indonesia",
    "Inggris",
    "Arab",
    "Indonesia + Arab (Al-Qur'an/Hadits)",
    "Indonesia + Inggris",
    "Sunda",
    "Jawa",
    "Padang (Minang)",
];

/// Majors with their study programs, first program is the default.
pub const STUDY_PROGRAMS: &[(&str, &[&str])] = &[
    (
        "Sains dan Teknologi",
        &[
            "Teknik Informatika",
            "Sistem Informasi",
            "Teknik Sipil",
            "Teknik Mesin",
            "Teknik Elektro",
            "Arsitektur",
            "Matematika",
            "Fisika",
            "Kimia",
            "Biologi",
            "Statistika",
        ],
    ),
    (
        "Ilmu Sosial dan Humaniora",
        &[
            "Ilmu Komunikasi",
            "Hubungan Internasional",
            "Ilmu Politik",
            "Sosiologi",
            "Antropologi",
            "Ilmu Hukum",
            "Psikologi",
            "Sastra Indonesia",
            "Sastra Inggris",
            "Sejarah",
        ],
    ),
    (
        "Ekonomi dan Bisnis",
        &[
            "Manajemen",
            "Akuntansi",
            "Ilmu Ekonomi",
            "Bisnis Digital",
            "Kewirausahaan",
            "Perbankan Syariah",
        ],
    ),
    (
        "Kesehatan",
        &[
            "Pendidikan Dokter",
            "Ilmu Keperawatan",
            "Farmasi",
            "Kesehatan Masyarakat",
            "Gizi",
        ],
    ),
    (
        "Pendidikan",
        &[
            "Pendidikan Guru Sekolah Dasar (PGSD)",
            "Pendidikan Anak Usia Dini (PAUD)",
            "Pendidikan Matematika",
            "Pendidikan Bahasa Inggris",
            "Pendidikan Jasmani",
            "Manajemen Pendidikan",
        ],
    ),
    (
        "Seni dan Desain",
        &[
            "Desain Komunikasi Visual (DKV)",
            "Seni Murni",
            "Desain Interior",
            "Musik",
            "Teater",
        ],
    ),
    (
        "Agama",
        &[
            "Ilmu Al-Qur'an dan Tafsir",
            "Hukum Keluarga Islam (Ahwal Syakhshiyyah)",
            "Komunikasi dan Penyiaran Islam",
            "Ekonomi Syariah",
            "Pendidikan Agama Islam",
        ],
    ),
];

pub const RESEARCH_INSTRUMENTS: &[&str] = &[
    "Wawancara",
    "Observasi",
    "Dokumentasi",
    "Kuesioner/Angket",
    "Tes Tertulis",
    "Skala Sikap",
    "Checklist (Daftar Periksa)",
    "Rubrik Penilaian",
    "Sheet Catatan Lapangan",
];

pub fn majors() -> impl Iterator<Item = &'static str> {
    STUDY_PROGRAMS.iter().map(|(major, _)| *major)
}

pub fn programs_for(major: &str) -> &'static [&'static str] {
    STUDY_PROGRAMS
        .iter()
        .find(|(m, _)| *m == major)
        .map(|(_, programs)| *programs)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_only_in_editable_lists() {
        assert!(!ACADEMIC_CHAPTERS.contains(&SUGGEST_CHAPTER_TITLES));
        assert!(BOOK_CHAPTERS.contains(&SUGGEST_CHAPTER_TITLES));
        assert!(NOVEL_CHAPTERS.contains(&SUGGEST_CHAPTER_TITLES));
    }

    #[test]
    fn test_programs_for_unknown_major_is_empty() {
        assert_eq!(programs_for("Sains dan Teknologi")[0], "Teknik Informatika");
        assert!(programs_for("Astrologi").is_empty());
        assert_eq!(majors().count(), STUDY_PROGRAMS.len());
    }
}
