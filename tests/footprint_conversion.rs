//! Footprint mode: library footprint → `<package>`.

use std::path::Path;

use kicad_openpnp::config::{Config, LibraryTableState, TemplateVars, FOOTPRINT_DIR_VAR};
use kicad_openpnp::error::Error;
use kicad_openpnp::kicad::{KicadError, LibraryTable};
use kicad_openpnp::openpnp::xml::{parse_document, Element};
use kicad_openpnp::openpnp::Style;
use kicad_openpnp::{convert_footprint, load_footprint};

const SOT_23: &str = r#"(footprint "SOT-23"
  (version 20240108)
  (generator "pcbnew")
  (layer "F.Cu")
  (descr "SOT, 3 Pin (JEDEC TO-236 Var AB)")
  (attr smd)
  (pad "1" smd roundrect (at -1.1375 -0.95) (size 1.325 0.6) (layers "F.Cu" "F.Paste" "F.Mask") (roundrect_rratio 0.25))
  (pad "2" smd roundrect (at -1.1375 0.95) (size 1.325 0.6) (layers "F.Cu" "F.Paste" "F.Mask") (roundrect_rratio 0.25))
  (pad "3" smd roundrect (at 1.1375 0) (size 1.325 0.6) (layers "F.Cu" "F.Paste" "F.Mask") (roundrect_rratio 0.25))
  (model "${MODELS}/SOT-23.wrl" (offset (xyz 0 0 0)) (scale (xyz 1 1 1)) (rotate (xyz 0 0 0)))
)"#;

const MIXED: &str = r#"(footprint "Mixed"
  (descr "Mixed pads")
  (pad "1" smd rect (at 0 0) (size 1 1) (layers "F.Cu"))
  (pad "2" smd circle (at 2 0) (size 1 1) (layers "F.Cu"))
  (pad "3" smd oval (at 4 0) (size 1 2) (layers "F.Cu"))
  (pad "4" smd roundrect (at 6 0) (size 1 1) (layers "F.Cu") (roundrect_rratio 0.1))
  (pad "5" thru_hole circle (at 8 0) (size 1.7 1.7) (drill 1) (layers "*.Cu" "*.Mask"))
  (pad "" np_thru_hole circle (at 10 0) (size 1 1) (drill 1) (layers "*.Cu"))
)"#;

const STEP_BOX: &str = "ISO-10303-21;
HEADER;
FILE_DESCRIPTION((''),'2;1');
FILE_NAME('SOT-23.step','2024-01-01T00:00:00',(''),(''),'','','');
FILE_SCHEMA(('AUTOMOTIVE_DESIGN'));
ENDSEC;
DATA;
#10 = CARTESIAN_POINT('',(-1.45,-0.65,0.));
#11 = CARTESIAN_POINT('',(1.45,0.65,1.1));
#12 = VERTEX_POINT('',#10);
#13 = VERTEX_POINT('',#11);
#20 = ( LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.) );
ENDSEC;
END-ISO-10303-21;
";

fn write_library(dir: &Path, name: &str, footprints: &[(&str, &str)]) -> std::path::PathBuf {
    let lib = dir.join(format!("{name}.pretty"));
    std::fs::create_dir_all(&lib).unwrap();
    for (fp_name, text) in footprints {
        std::fs::write(lib.join(format!("{fp_name}.kicad_mod")), text).unwrap();
    }
    lib
}

fn config(vars: TemplateVars) -> Config {
    Config::new(vars, LibraryTableState::Loaded(LibraryTable::default()))
}

fn pads(package: &Element) -> Vec<&Element> {
    package
        .elements_named("footprint")
        .next()
        .unwrap()
        .elements_named("pad")
        .collect()
}

#[test]
fn converts_footprint_with_step_sibling() {
    let dir = tempfile::tempdir().unwrap();
    let lib = write_library(dir.path(), "Package_TO_SOT_SMD", &[("SOT-23", SOT_23)]);
    let models = dir.path().join("models");
    std::fs::create_dir(&models).unwrap();
    std::fs::write(models.join("SOT-23.wrl"), "#VRML V2.0 utf8\n").unwrap();
    std::fs::write(models.join("SOT-23.step"), STEP_BOX).unwrap();

    let vars: TemplateVars = [("MODELS", models.to_string_lossy().into_owned())]
        .into_iter()
        .collect();
    let xml = convert_footprint(
        &config(vars),
        Some(lib.to_str().unwrap()),
        "SOT-23",
        Style::Compact,
    )
    .unwrap();

    let package = parse_document(&xml).unwrap();
    assert_eq!(package.name, "package");
    assert_eq!(package.attribute("version"), Some("1.1"));
    assert_eq!(package.attribute("id"), Some("Package_TO_SOT_SMD:SOT-23"));
    assert_eq!(
        package.attribute("description"),
        Some("SOT, 3 Pin (JEDEC TO-236 Var AB)")
    );

    let footprint = package.elements_named("footprint").next().unwrap();
    assert_eq!(footprint.attribute("units"), Some("Millimeters"));
    assert_eq!(footprint.attribute("body-width"), Some("2.9"));
    assert_eq!(footprint.attribute("body-height"), Some("1.3"));

    let pads = pads(&package);
    assert_eq!(pads.len(), 3);
    assert_eq!(pads[0].attribute("name"), Some("1"));
    assert_eq!(pads[0].attribute("width"), Some("1.325"));
    assert_eq!(pads[0].attribute("height"), Some("0.6"));
    assert_eq!(pads[0].attribute("x"), Some("-1.1375"));
    assert_eq!(pads[0].attribute("y"), Some("-0.95"));
    assert_eq!(pads[0].attribute("roundness"), Some("0.25"));
    assert_eq!(pads[0].attribute("rotation"), Some("0.0"));
}

#[test]
fn wrl_only_model_has_no_body() {
    let dir = tempfile::tempdir().unwrap();
    let lib = write_library(dir.path(), "Package_TO_SOT_SMD", &[("SOT-23", SOT_23)]);
    std::fs::write(dir.path().join("SOT-23.wrl"), "#VRML V2.0 utf8\n").unwrap();

    let vars: TemplateVars = [("MODELS", dir.path().to_string_lossy().into_owned())]
        .into_iter()
        .collect();
    let xml = convert_footprint(&config(vars), Some(lib.to_str().unwrap()), "SOT-23", Style::Compact)
        .unwrap();

    let package = parse_document(&xml).unwrap();
    let footprint = package.elements_named("footprint").next().unwrap();
    assert_eq!(footprint.attribute("body-width"), None);
    assert_eq!(footprint.attribute("body-height"), None);
    assert_eq!(pads(&package).len(), 3);
}

#[test]
fn pad_shapes_and_smd_filter() {
    let dir = tempfile::tempdir().unwrap();
    let lib = write_library(dir.path(), "Test", &[("Mixed", MIXED)]);

    let xml = convert_footprint(
        &config(TemplateVars::new()),
        Some(lib.to_str().unwrap()),
        "Mixed",
        Style::Compact,
    )
    .unwrap();
    let package = parse_document(&xml).unwrap();

    let pads = pads(&package);
    let roundness: Vec<_> = pads.iter().map(|p| p.attribute("roundness").unwrap()).collect();
    assert_eq!(roundness, vec!["0", "100", "100", "0.1"]);
    assert_eq!(pads[0].attribute("width"), Some("1.0"));

    let footprint = package.elements_named("footprint").next().unwrap();
    assert_eq!(footprint.attribute("body-width"), None);
}

#[test]
fn qualified_name_and_nickname_lookup() {
    let dir = tempfile::tempdir().unwrap();
    write_library(dir.path(), "Package_TO_SOT_SMD", &[("SOT-23", SOT_23)]);

    let vars: TemplateVars = [(FOOTPRINT_DIR_VAR, dir.path().to_string_lossy().into_owned())]
        .into_iter()
        .collect();
    let config = config(vars);

    let fp = load_footprint(&config, None, "Package_TO_SOT_SMD:SOT-23").unwrap();
    assert_eq!(fp.lib_id.to_string(), "Package_TO_SOT_SMD:SOT-23");

    let fp = load_footprint(&config, Some("Package_TO_SOT_SMD"), "SOT-23").unwrap();
    assert_eq!(fp.pads.len(), 3);
}

#[test]
fn nickname_resolves_through_library_table() {
    let dir = tempfile::tempdir().unwrap();
    let lib = write_library(&dir.path().join("elsewhere"), "Whatever", &[("SOT-23", SOT_23)]);

    let table = LibraryTable::parse(
        &format!(
            r#"(fp_lib_table (lib (name "MySOT")(type "KiCad")(uri "{}")))"#,
            lib.display()
        ),
        &TemplateVars::new(),
    )
    .unwrap();
    let config = Config::new(TemplateVars::new(), LibraryTableState::Loaded(table));

    let fp = load_footprint(&config, Some("MySOT"), "SOT-23").unwrap();
    assert_eq!(fp.lib_id.to_string(), "MySOT:SOT-23");
}

#[test]
fn pretty_output_is_indented() {
    let dir = tempfile::tempdir().unwrap();
    let lib = write_library(dir.path(), "Test", &[("Mixed", MIXED)]);

    let xml = convert_footprint(
        &config(TemplateVars::new()),
        Some(lib.to_str().unwrap()),
        "Mixed",
        Style::footprint(true),
    )
    .unwrap();

    let lines: Vec<_> = xml.lines().collect();
    assert!(lines[0].starts_with("<package "));
    assert!(lines[1].starts_with("  <footprint "));
    assert!(lines[2].starts_with("    <pad "));
    assert!(lines[2].ends_with(" />"));
    assert_eq!(*lines.last().unwrap(), "</package>");
}

#[test]
fn missing_footprint_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let lib = write_library(dir.path(), "Test", &[]);

    let err = convert_footprint(
        &config(TemplateVars::new()),
        Some(lib.to_str().unwrap()),
        "Nope",
        Style::Compact,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Kicad(KicadError::FootprintNotFound { .. })
    ));
}

#[test]
fn missing_library_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("Missing.pretty");

    let err = load_footprint(
        &config(TemplateVars::new()),
        Some(missing.to_str().unwrap()),
        "X",
    )
    .unwrap_err();
    assert!(matches!(err, KicadError::LibraryNotFound { .. }));

    let err = load_footprint(&config(TemplateVars::new()), None, "X").unwrap_err();
    assert!(matches!(err, KicadError::MissingLibrary { .. }));
}

#[test]
fn malformed_footprint_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let lib = write_library(dir.path(), "Test", &[("Broken", "(footprint \"Broken\" (pad \"1\" smd")]);

    let err = load_footprint(&config(TemplateVars::new()), Some(lib.to_str().unwrap()), "Broken")
        .unwrap_err();
    assert!(matches!(err, KicadError::Parse { .. }));
}
