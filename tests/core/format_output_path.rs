//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod passing {
    use std::path::{Path, PathBuf};

    use epub_translator::core::format_output_path;

    #[test]
    fn next_to_input() {
        let final_destination =
            format_output_path(Path::new("/home/username/Books/novel.epub"), "tr");

        assert_eq!(
            final_destination,
            PathBuf::from("/home/username/Books/novel_translated_tr.epub")
        );
    }

    #[test]
    fn relative_input() {
        let final_destination = format_output_path(Path::new("novel.epub"), "de");

        assert_eq!(final_destination, PathBuf::from("novel_translated_de.epub"));
    }

    #[test]
    fn level_up() {
        let final_destination = format_output_path(Path::new("../novel.epub"), "fr");

        assert_eq!(final_destination, PathBuf::from("../novel_translated_fr.epub"));
    }

    #[test]
    fn converted_input_becomes_epub() {
        let final_destination = format_output_path(Path::new("/books/story.azw3"), "tr");

        assert_eq!(
            final_destination,
            PathBuf::from("/books/story_translated_tr.epub")
        );
    }

    #[test]
    fn only_last_extension_is_dropped() {
        let final_destination = format_output_path(Path::new("/books/vol.1.epub"), "tr");

        assert_eq!(
            final_destination,
            PathBuf::from("/books/vol.1_translated_tr.epub")
        );
    }

    #[test]
    fn region_subtag() {
        let final_destination = format_output_path(Path::new("/books/a.epub"), "pt-br");

        assert_eq!(
            final_destination,
            PathBuf::from("/books/a_translated_pt-br.epub")
        );
    }
}
