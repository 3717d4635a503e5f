//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod passing {
    use std::path::PathBuf;

    use epub_translator::core::RunConfig;
    use epub_translator::translation::{BackendKind, LanguagePair, TranslatorConfig};

    #[test]
    fn defaults() {
        let config = RunConfig::new("book.epub", LanguagePair::new("en", "tr"), BackendKind::Local);

        assert!(!config.test_mode);
        assert_eq!(config.start_index, 0);
        assert!(config.skip_navigation);
        assert!(!config.cancel.is_cancelled());
        assert_eq!(config.output_path(), PathBuf::from("book_translated_tr.epub"));
    }

    #[test]
    fn explicit_output() {
        let mut config =
            RunConfig::new("book.epub", LanguagePair::new("en", "tr"), BackendKind::Local);
        config.output = Some(PathBuf::from("/tmp/out.epub"));

        assert_eq!(config.output_path(), PathBuf::from("/tmp/out.epub"));
    }

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let config = RunConfig::new("book.epub", LanguagePair::new("en", "tr"), BackendKind::Local);
        let handle = config.cancel.clone();
        handle.cancel();

        assert!(config.cancel.is_cancelled());
    }

    #[test]
    fn credentials_come_from_config() {
        let translator_config = TranslatorConfig {
            backend: "deepl".to_string(),
            deepl_key: Some("abc:fx".to_string()),
            ..TranslatorConfig::default()
        };
        let config = RunConfig::from_config(&translator_config, "book.epub").unwrap();

        assert_eq!(config.backend, BackendKind::CloudKeyed);
        assert_eq!(config.credentials.deepl_key.as_deref(), Some("abc:fx"));
    }
}

//  ███████╗ █████╗ ██╗██╗     ██╗███╗   ██╗ ██████╗
//  ██╔════╝██╔══██╗██║██║     ██║████╗  ██║██╔════╝
//  █████╗  ███████║██║██║     ██║██╔██╗ ██║██║  ███╗
//  ██╔══╝  ██╔══██║██║██║     ██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║██║███████╗██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚═╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod failing {
    use epub_translator::core::RunConfig;
    use epub_translator::translation::{
        BackendKind, LanguagePair, TranslationError, TranslatorConfig,
    };

    #[test]
    fn unknown_backend() {
        let translator_config = TranslatorConfig {
            backend: "babelfish".to_string(),
            ..TranslatorConfig::default()
        };

        assert!(matches!(
            RunConfig::from_config(&translator_config, "book.epub"),
            Err(TranslationError::ConfigError(_))
        ));
    }

    #[test]
    fn missing_input() {
        let config = RunConfig::new(
            "/nonexistent/book.epub",
            LanguagePair::new("en", "tr"),
            BackendKind::FreeHeuristic,
        );

        assert!(matches!(config.validate(), Err(TranslationError::ConfigError(_))));
    }

    #[test]
    fn missing_gemini_key() {
        let input = tempfile::NamedTempFile::new().unwrap();
        let config = RunConfig::new(
            input.path(),
            LanguagePair::new("en", "tr"),
            BackendKind::LlmPrompted,
        );

        assert!(matches!(config.validate(), Err(TranslationError::ConfigError(_))));
    }

    #[test]
    fn zero_test_limit() {
        let input = tempfile::NamedTempFile::new().unwrap();
        let mut config = RunConfig::new(
            input.path(),
            LanguagePair::new("en", "tr"),
            BackendKind::FreeHeuristic,
        );
        config.test_mode = true;
        config.test_limit = 0;

        assert!(config.validate().is_err());
    }
}
