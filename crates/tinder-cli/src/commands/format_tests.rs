use std::path::Path;

use indoc::indoc;
use tinder::Tinderstarter;
use tinder_core::Colors;

use super::format_compile_error;

#[test]
fn parse_failures_render_an_annotated_snippet() {
    let source = indoc! {"
        set x to 1
        set y to
    "};
    let err = Tinderstarter::new().unwrap().compile(source).unwrap_err();
    let rendered = format_compile_error(&err, source, Path::new("broken.tinder"), Colors::OFF);
    assert!(rendered.contains("broken.tinder"), "got: {rendered}");
    assert!(rendered.contains("set y to"), "got: {rendered}");
}

#[test]
fn structural_errors_fall_back_to_plain_messages() {
    let source = "endif";
    let err = Tinderstarter::new().unwrap().compile(source).unwrap_err();
    let rendered = format_compile_error(&err, source, Path::new("blocks.tinder"), Colors::OFF);
    assert!(rendered.starts_with("error:"), "got: {rendered}");
    assert!(rendered.contains("unmatched 'endif'"), "got: {rendered}");
}
