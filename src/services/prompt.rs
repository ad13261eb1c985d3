use crate::core::catalog::SUGGEST_CHAPTER_TITLES;
use crate::core::document::{DocumentConfiguration, DocumentMode, ResearchMethod};

/// Builds the instruction for one chapter. `context` holds the delimited
/// text of the chapters generated before this one (empty for the first).
pub fn compose_prompt(config: &DocumentConfiguration, chapter: &str, context: &str) -> String {
    if chapter == SUGGEST_CHAPTER_TITLES {
        return compose_chapter_titles_prompt(config);
    }

    match config.mode() {
        DocumentMode::Creative => compose_creative_prompt(config, chapter, context),
        DocumentMode::Academic | DocumentMode::Book | DocumentMode::Sermon => {
            compose_academic_prompt(config, chapter, context)
        }
    }
}

fn compose_chapter_titles_prompt(config: &DocumentConfiguration) -> String {
    format!(
        "Berdasarkan konteks karya tulis ini (jenis: {}, judul: \"{}\", topik: \"{}\"), \
         sarankan 5 judul bab yang menarik dan relevan. Format sebagai daftar bernomor.",
        config.kind, config.title, config.topic_description
    )
}

fn compose_creative_prompt(config: &DocumentConfiguration, chapter: &str, context: &str) -> String {
    let style = &config.writing_style;
    let premise = if config.synopsis.trim().is_empty() {
        &config.topic_description
    } else {
        &config.synopsis
    };
    let context = if context.is_empty() {
        "Ini adalah bab pertama, mulailah ceritanya."
    } else {
        context
    };
    let pages = config.page_count_for(chapter);

    let mut prompt = format!(
        "Anda adalah seorang novelis ahli dengan gaya penulisan yang mirip dengan \"{style}\". \
         Tugas Anda adalah menulis bab \"{chapter}\" untuk sebuah novel berjudul \"{}\".\n\n",
        config.title
    );
    prompt.push_str(&format!("**Premis & Sinopsis Utama Novel:**\n{premise}\n\n"));
    prompt.push_str(&format!(
        "**Konteks dari Bab Sebelumnya (Gunakan ini untuk menjaga kesinambungan cerita):**\n{context}\n\n"
    ));
    prompt.push_str(&format!("**Instruksi untuk Bab \"{chapter}\":**\n"));

    let instructions = [
        "**Fokus Cerita:** Lanjutkan narasi dari bab sebelumnya. Jika ini bab pertama, perkenalkan dunia, karakter utama, dan konflik awal sesuai sinopsis.".to_string(),
        "**Pengembangan Plot:** Majukan alur cerita. Ciptakan ketegangan, perkenalkan rintangan, atau ungkap informasi baru yang penting. Hindari cerita yang monoton.".to_string(),
        "**Pengembangan Karakter:** Tunjukkan kepribadian karakter melalui tindakan, dialog, dan pikiran mereka. Kembangkan hubungan antar karakter.".to_string(),
        "**Dialog yang Hidup:** Tulis dialog yang terasa alami dan berfungsi untuk memajukan plot atau mengungkapkan karakter.".to_string(),
        "**Deskripsi yang Kaya:** Lukiskan latar tempat dan suasana dengan deskripsi yang imersif tanpa memperlambat laju cerita.".to_string(),
        "**Konsistensi:** Jaga konsistensi karakter, latar, dan aturan dunia yang telah ditetapkan di bab-bab sebelumnya.".to_string(),
        format!(
            "**Bahasa & Gaya:** Gunakan bahasa {} dan pertahankan gaya penulisan \"{style}\".",
            config.output_language
        ),
        format!("**Target Panjang:** Tulis konten dengan panjang yang kira-kira setara dengan {pages} halaman."),
        "**Output:** Tuliskan HANYA konten bab tersebut. Jangan menyertakan ringkasan, komentar, atau judul bab di dalam output. Mulai langsung dengan paragraf pertama. Gunakan format narasi novel standar.".to_string(),
    ];
    let numbered: Vec<String> = instructions
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{}.  {}", i + 1, line))
        .collect();
    prompt.push_str(&numbered.join("\n"));
    prompt
}

fn compose_academic_prompt(config: &DocumentConfiguration, chapter: &str, context: &str) -> String {
    let pages = config.page_count_for(chapter);

    let mut prompt = format!(
        "Anda adalah asisten penulis AI ahli. Tugas Anda adalah menghasilkan konten untuk bab \"{chapter}\" \
         dari sebuah karya dengan jenis \"{}\" berjudul \"{}\".\n\n",
        config.kind, config.title
    );

    let mut facts = vec![
        format!("- **Deskripsi Topik:** {}", config.topic_description),
        format!("- **Jurusan/Fakultas:** {}", config.major),
        format!("- **Program Studi:** {}", config.study_program),
        format!("- **Bahasa Output:** {}", config.output_language),
        format!("- **Gaya Penulisan:** Tulis dengan gaya seorang \"{}\"", config.writing_style),
        format!("- **Bentuk Penelitian:** {}", config.research_method),
    ];
    if config.research_method == ResearchMethod::Kuantitatif && !config.variables.trim().is_empty() {
        facts.push(format!("- **Variabel Penelitian:** {}", config.variables));
    }
    if !config.research_instruments.is_empty() {
        facts.push(format!(
            "- **Instrumen Penelitian yang Digunakan:** {}",
            config.research_instruments.join(", ")
        ));
    }
    facts.push(format!(
        "- **Jumlah Referensi:** Sekitar {} referensi",
        config.reference_count_for(chapter)
    ));
    facts.push(format!("- **Gaya Sitasi:** {}", config.citation_style));
    facts.push(format!("- **Jenis Kutipan:** {}", config.reference_type));
    let start = config.start_year.trim();
    let end = config.end_year.trim();
    if !start.is_empty() || !end.is_empty() {
        facts.push(format!(
            "- **Rentang Tahun Referensi:** {} - {}",
            if start.is_empty() { "awal" } else { start },
            if end.is_empty() { "sekarang" } else { end }
        ));
    }
    facts.push(format!("- **Target Panjang Bab:** Sekitar {pages} halaman."));

    prompt.push_str("**Konteks Utama:**\n");
    prompt.push_str(&facts.join("\n"));
    prompt.push_str("\n\n");

    if !context.is_empty() {
        prompt.push_str(&format!(
            "**Konteks dari Bab Sebelumnya (untuk menjaga konsistensi):**\n{context}\n\n"
        ));
    }

    prompt.push_str("**Instruksi:**\n");
    prompt.push_str(&format!(
        "1. Tuliskan konten untuk bab \"{chapter}\" secara komprehensif dan terstruktur dengan baik.\n"
    ));
    prompt.push_str("2. Pastikan isinya relevan dengan judul, topik, dan parameter yang diberikan.\n");
    prompt.push_str("3. Gunakan format Markdown untuk heading (e.g., '# Judul', '## Sub-judul').\n");
    prompt.push_str(&format!(
        "4. Jika referensi digunakan, sertakan kutipan dalam teks sesuai gaya sitasi \"{}\".\n",
        config.citation_style
    ));
    prompt.push_str("5. Hasil akhir harus langsung berupa konten bab, tanpa pengantar atau komentar tambahan dari Anda sebagai AI.\n");
    prompt.push_str("6. Untuk penulisan karya ilmiah (Skripsi, Tesis, Disertasi), jika ada tabel, format tabel tersebut menggunakan sintaks Markdown yang rapi. Pastikan setiap tabel memiliki judul (contoh: Tabel 4.1: Hasil Uji ...) dan header kolom yang jelas.\n");
    prompt
}

pub fn compose_title_search_prompt(config: &DocumentConfiguration) -> String {
    format!(
        "Berikan 5 saran judul untuk jenis karya \"{}\" dengan deskripsi topik berikut: \"{}\". \
         Judul harus relevan untuk jurusan \"{}\" dan program studi \"{}\". \
         Judul harus dalam Bahasa Indonesia. Kembalikan hanya daftar judul, dipisahkan oleh baris baru, \
         tanpa penomoran atau embel-embel lainnya.",
        config.kind, config.topic_description, config.major, config.study_program
    )
}

pub fn compose_variables_prompt(config: &DocumentConfiguration) -> String {
    format!(
        "Berdasarkan judul penelitian \"{}\" dan deskripsi topik \"{}\", identifikasi dan sarankan \
         variabel independen (X) dan variabel dependen (Y). Format hasilnya secara ringkas dalam satu baris, \
         contohnya: \"X = Motivasi Belajar, Y = Prestasi Akademik\". Hanya kembalikan teks variabelnya saja, \
         tanpa penjelasan tambahan.",
        config.title, config.topic_description
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::DocumentKind;

    fn academic() -> DocumentConfiguration {
        DocumentConfiguration {
            title: "Pengaruh Media Sosial".to_string(),
            topic_description: "Dampak media sosial pada mahasiswa".to_string(),
            ..DocumentConfiguration::default()
        }
    }

    fn novel() -> DocumentConfiguration {
        DocumentConfiguration {
            kind: DocumentKind::Novel,
            title: "Langit Senja".to_string(),
            topic_description: "Kisah dua sahabat".to_string(),
            writing_style: "Tere Liye".to_string(),
            ..DocumentConfiguration::default()
        }
    }

    #[test]
    fn test_title_suggestion_ignores_context() {
        let config = academic();
        let prompt = compose_prompt(&config, SUGGEST_CHAPTER_TITLES, "--- AWAL DARI: x ---");
        assert!(prompt.contains("sarankan 5 judul bab"));
        assert!(prompt.contains("jenis: Skripsi"));
        assert!(prompt.contains("\"Pengaruh Media Sosial\""));
        assert!(!prompt.contains("AWAL DARI"));
    }

    #[test]
    fn test_creative_prompt_uses_topic_when_synopsis_missing() {
        let mut config = novel();
        let prompt = compose_prompt(&config, "Bab 1", "");
        assert!(prompt.contains("mirip dengan \"Tere Liye\""));
        assert!(prompt.contains("**Premis & Sinopsis Utama Novel:**\nKisah dua sahabat"));
        assert!(prompt.contains("Ini adalah bab pertama, mulailah ceritanya."));
        assert!(prompt.contains("9.  **Output:**"));
        assert!(!prompt.contains("Gaya Sitasi"));

        config.synopsis = "Dua sahabat berpisah".to_string();
        let prompt = compose_prompt(&config, "Bab 2", "KONTEKS");
        assert!(prompt.contains("Novel:**\nDua sahabat berpisah"));
        assert!(prompt.contains("kesinambungan cerita):**\nKONTEKS\n\n"));
        assert!(!prompt.contains("Ini adalah bab pertama"));
    }

    #[test]
    fn test_creative_prompt_has_nine_instructions() {
        let prompt = compose_prompt(&novel(), "Prolog", "");
        for n in 1..=9 {
            assert!(prompt.contains(&format!("\n{}.  **", n)), "missing instruction {}", n);
        }
    }

    #[test]
    fn test_academic_prompt_context_block() {
        let mut config = academic();
        config.research_method = ResearchMethod::Kuantitatif;
        config.variables = "X = Media Sosial, Y = Prestasi".to_string();
        config.research_instruments = vec!["Kuesioner/Angket".to_string(), "Wawancara".to_string()];
        config.start_year = "2015".to_string();
        config.chapter_reference_counts.insert("Bab 2: Kajian Pustaka".to_string(), 25);
        config.chapter_page_counts.insert("Bab 2: Kajian Pustaka".to_string(), 9);

        let prompt = compose_prompt(&config, "Bab 2: Kajian Pustaka", "");
        assert!(prompt.contains("- **Bentuk Penelitian:** Kuantitatif\n"));
        assert!(prompt.contains("- **Variabel Penelitian:** X = Media Sosial, Y = Prestasi\n"));
        assert!(prompt.contains("- **Instrumen Penelitian yang Digunakan:** Kuesioner/Angket, Wawancara\n"));
        assert!(prompt.contains("- **Jumlah Referensi:** Sekitar 25 referensi\n"));
        assert!(prompt.contains("- **Rentang Tahun Referensi:** 2015 - sekarang\n"));
        assert!(prompt.contains("- **Target Panjang Bab:** Sekitar 9 halaman.\n\n"));
        assert!(!prompt.contains("Konteks dari Bab Sebelumnya"));
        assert!(prompt.contains("gaya sitasi \"APA\""));
        assert!(prompt.contains("\n6. Untuk penulisan karya ilmiah"));
    }

    #[test]
    fn test_academic_prompt_omits_optional_lines() {
        let mut config = academic();
        config.variables = "X = A".to_string();
        let prompt = compose_prompt(&config, "Bab 1: Pendahuluan", "");
        assert!(!prompt.contains("Variabel Penelitian"));
        assert!(!prompt.contains("Instrumen Penelitian"));
        assert!(!prompt.contains("Rentang Tahun"));
        assert!(prompt.contains("Sekitar 10 referensi"));
        assert!(prompt.contains("Sekitar 5 halaman"));
    }

    #[test]
    fn test_academic_prompt_embeds_context() {
        let prompt = compose_prompt(&academic(), "Bab 2: Kajian Pustaka", "ISI BAB SATU");
        assert!(prompt.contains(
            "**Konteks dari Bab Sebelumnya (untuk menjaga konsistensi):**\nISI BAB SATU\n\n**Instruksi:**"
        ));
    }

    #[test]
    fn test_book_and_sermon_use_academic_branch() {
        let mut config = academic();
        config.kind = DocumentKind::Khutbah;
        let prompt = compose_prompt(&config, "Bab 1: Pendahuluan", "");
        assert!(prompt.starts_with("Anda adalah asisten penulis AI ahli."));
        config.kind = DocumentKind::Buku;
        let prompt = compose_prompt(&config, "Bab 1", "");
        assert!(prompt.contains("jenis \"Buku\""));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let config = academic();
        assert_eq!(
            compose_prompt(&config, "Abstrak", "ctx"),
            compose_prompt(&config, "Abstrak", "ctx")
        );
    }

    #[test]
    fn test_assist_prompts() {
        let config = academic();
        let titles = compose_title_search_prompt(&config);
        assert!(titles.contains("\"Skripsi\""));
        assert!(titles.contains("jurusan \"Sains dan Teknologi\""));
        let variables = compose_variables_prompt(&config);
        assert!(variables.contains("\"Pengaruh Media Sosial\""));
    }
}
