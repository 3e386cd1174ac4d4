use std::path::Path;

use iotables::data::loader::{write_grid, Grid};
use iotables::parsers::{EORA_SOURCE, EUROSTAT_SOURCE, EXIOBASE3_SOURCE, EXIOBASE_SUT_SOURCE};
use iotables::{
    parse_eora, parse_eurostat, parse_eurostat_source, parse_exiobase3, parse_exiobase_sut,
    EoraOptions, Error, EurostatOptions, Exiobase3Options, ExiobaseSutOptions, ExiobaseVersion,
    Label, Level, MatrixName, MemoryWorkbook, ModelKind, NameConvention, ScenarioKey, TableKind,
};

fn grid(rows: &[&[&str]]) -> Grid {
    rows.iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect()
}

fn write(path: &Path, rows: &[&[&str]], delimiter: u8) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    write_grid(path, &grid(rows), delimiter).unwrap();
}

// ---------------------------------------------------------------------------
// exiobase3
// ---------------------------------------------------------------------------

const FACTOR_ROWS: [&str; 9] = [
    "Taxes less subsidies on products purchased: Total",
    "Other net taxes on production",
    "Compensation of employees; wages, salaries, & employers' social contributions: Low-skilled",
    "Compensation of employees; wages, salaries, & employers' social contributions: Medium-skilled",
    "Compensation of employees; wages, salaries, & employers' social contributions: High-skilled",
    "Operating surplus: Consumption of fixed capital",
    "Operating surplus: Rents on land",
    "Operating surplus: Royalties on resources",
    "Operating surplus: Remaining net operating surplus",
];
const STRESSOR: &str = "CO2 - combustion - air";

fn exiobase3_fixture(dir: &Path, final_demand_file: &str) {
    write(
        &dir.join("Z.txt"),
        &[
            &["region", "", "IT", "IT"],
            &["sector", "", "Agriculture", "Mining"],
            &["region", "sector", "", ""],
            &["IT", "Agriculture", "10", "5"],
            &["IT", "Mining", "3", "8"],
        ],
        b'\t',
    );
    write(
        &dir.join("Y.txt"),
        &[
            &["region", "", "IT"],
            &["category", "", "Final consumption expenditure by households"],
            &["IT", "Agriculture", "50"],
            &["IT", "Mining", "40"],
        ],
        b'\t',
    );

    let mut f: Vec<Vec<String>> = vec![
        vec!["region".into(), "IT".into(), "IT".into()],
        vec!["stressor".into(), "Agriculture".into(), "Mining".into()],
    ];
    let mut fy: Vec<Vec<String>> = vec![
        vec!["region".into(), "IT".into()],
        vec!["category".into(), "Final consumption expenditure by households".into()],
    ];
    let mut sat_units: Vec<Vec<String>> = vec![vec!["stressor".into(), "unit".into()]];
    for (i, name) in FACTOR_ROWS.iter().chain([STRESSOR].iter()).enumerate() {
        f.push(vec![name.to_string(), (i + 1).to_string(), (2 * i + 1).to_string()]);
        fy.push(vec![name.to_string(), if i < 9 { "0".into() } else { "7.5".into() }]);
        let unit = if i < 9 { "M.EUR" } else { "kg" };
        sat_units.push(vec![name.to_string(), unit.to_string()]);
    }
    std::fs::create_dir_all(dir.join("satellite")).unwrap();
    write_grid(&dir.join("satellite/F.txt"), &f, b'\t').unwrap();
    write_grid(&dir.join("satellite").join(final_demand_file), &fy, b'\t').unwrap();
    write_grid(&dir.join("satellite/unit.txt"), &sat_units, b'\t').unwrap();

    write(
        &dir.join("unit.txt"),
        &[
            &["region", "sector", "unit"],
            &["IT", "Agriculture", "M.EUR"],
            &["IT", "Mining", "M.EUR"],
        ],
        b'\t',
    );
}

#[test]
fn exiobase3_splits_factor_inputs_from_stressors() {
    let dir = tempfile::tempdir().unwrap();
    exiobase3_fixture(dir.path(), "F_Y.txt");

    let db = parse_exiobase3(dir.path(), &Exiobase3Options::default()).unwrap();
    assert_eq!(db.table(), TableKind::Iot);
    assert_eq!(db.metadata().source.as_deref(), Some(EXIOBASE3_SOURCE));

    let v = db.matrix("baseline", MatrixName::V).unwrap();
    assert_eq!(v.rows.len(), 9);
    let e = db.matrix("baseline", MatrixName::E).unwrap();
    assert_eq!(e.rows, vec![Label::global(Level::SatelliteAccount, STRESSOR)]);
    assert_eq!(e.data, vec![10.0, 19.0]);
    assert_eq!(db.matrix("baseline", MatrixName::EY).unwrap().data, vec![7.5]);

    assert_eq!(db.units().get(Level::SatelliteAccount, STRESSOR), Some("kg"));
    assert_eq!(db.units().get(Level::Sector, "Mining"), Some("M.EUR"));
}

#[test]
fn exiobase3_version_picks_final_demand_file() {
    let dir = tempfile::tempdir().unwrap();
    exiobase3_fixture(dir.path(), "F_hh.txt");

    let err = parse_exiobase3(dir.path(), &Exiobase3Options::default()).unwrap_err();
    assert!(matches!(err, Error::Read { .. }), "{err}");

    let opts = Exiobase3Options {
        version: ExiobaseVersion::V3_8_1,
        ..Default::default()
    };
    assert!(parse_exiobase3(dir.path(), &opts).is_ok());
}

#[test]
fn exiobase3_rejects_unknown_versions() {
    match "3.7.0".parse::<ExiobaseVersion>() {
        Err(Error::InvalidArgument { argument, valid, .. }) => {
            assert_eq!(argument, "version");
            assert_eq!(valid, vec!["3.8.2", "3.8.1"]);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// exiobase SUT
// ---------------------------------------------------------------------------

#[test]
fn exiobase_sut_transposes_supply() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    let header: [&[&str]; 2] = [
        &["region", "", "IT", "IT"],
        &["industry", "", "Farming", "Retail"],
    ];
    write(
        &d.join("supply.csv"),
        &[header[0], header[1], &["IT", "Food", "90", "0"], &["IT", "Goods", "5", "70"]],
        b',',
    );
    write(
        &d.join("use.csv"),
        &[header[0], header[1], &["IT", "Food", "10", "20"], &["IT", "Goods", "15", "5"]],
        b',',
    );
    write(
        &d.join("final_demand.csv"),
        &[
            &["region", "", "IT"],
            &["category", "", "Households"],
            &["IT", "Food", "60"],
            &["IT", "Goods", "45"],
        ],
        b',',
    );
    let va_header: [&[&str]; 2] = [&["region", "IT", "IT"], &["industry", "Farming", "Retail"]];
    write(&d.join("value_added.csv"), &[va_header[0], va_header[1], &["Wages", "30", "25"]], b',');
    write(&d.join("extensions.csv"), &[va_header[0], va_header[1], &["CO2", "3", "1"]], b',');
    write(
        &d.join("units.csv"),
        &[
            &["level", "item", "unit"],
            &["Factor of production", "Wages", "M.EUR"],
            &["Satellite account", "CO2", "kt"],
        ],
        b',',
    );

    let db = parse_exiobase_sut(d, &ExiobaseSutOptions::default()).unwrap();
    assert_eq!(db.table(), TableKind::Sut);
    assert_eq!(db.metadata().source.as_deref(), Some(EXIOBASE_SUT_SOURCE));

    let farming = Label::regional("IT", Level::Activity, "Farming");
    let food = Label::regional("IT", Level::Commodity, "Food");
    let goods = Label::regional("IT", Level::Commodity, "Goods");
    let z = db.matrix("baseline", MatrixName::Z).unwrap();
    assert_eq!(z.value(&farming, &food), Some(90.0));
    assert_eq!(z.value(&goods, &farming), Some(15.0));
    assert_eq!(z.value(&farming, &farming), Some(0.0));

    let y = db.matrix("baseline", MatrixName::Y).unwrap();
    let households = Label::regional("IT", Level::ConsumptionCategory, "Households");
    assert_eq!(y.value(&goods, &households), Some(45.0));
    assert_eq!(y.value(&farming, &households), Some(0.0));

    assert_eq!(db.units().get(Level::Activity, "Farming"), Some("M.EUR"));
    assert_eq!(db.units().get(Level::SatelliteAccount, "CO2"), Some("kt"));
}

// ---------------------------------------------------------------------------
// eora
// ---------------------------------------------------------------------------

fn eora_single_fixture(path: &Path) {
    write(
        path,
        &[
            &["", "", "", "", "Italy", "Italy", "Italy", "France", "Germany"],
            &["", "", "", "", "ITA", "ITA", "ITA", "FRA", "DEU"],
            &[
                "", "", "", "", "Industries", "Industries", "Final Demand", "Exports To",
                "Exports To",
            ],
            &[
                "", "", "", "", "Agriculture", "Manufacturing", "Household final consumption",
                "Total", "Total",
            ],
            &["Italy", "ITA", "Industries", "Agriculture", "5", "3", "40", "7", "8"],
            &["Italy", "ITA", "Industries", "Manufacturing", "2", "6", "50", "9", "1"],
            &[
                "Italy", "ITA", "Primary Inputs", "Compensation of employees", "20", "30", "0", "0",
                "0",
            ],
            &["France", "FRA", "Imports From", "Total", "4", "2", "6", "0", "0"],
            &["Germany", "DEU", "Imports From", "Total", "1", "1", "2", "0", "0"],
            &["Italy", "ITA", "Satellites", "CO2 (Gg)", "1.5", "2.5", "0.5", "0", "0"],
        ],
        b'\t',
    );
}

#[test]
fn eora_single_region_aggregates_trade() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("IO_ITA_2015_BasicPrice.txt");
    eora_single_fixture(&file);

    let db = parse_eora(&file, &EoraOptions::default()).unwrap();
    assert_eq!(db.metadata().source.as_deref(), Some(EORA_SOURCE));
    assert_eq!(db.indices().regions(), ["Italy"]);

    let agriculture = Label::regional("Italy", Level::Sector, "Agriculture");
    let imports = Label::global(Level::FactorOfProduction, "Imports");
    let exports = Label::regional("Italy", Level::ConsumptionCategory, "Exports");
    let v = db.matrix("baseline", MatrixName::V).unwrap();
    assert_eq!(v.value(&imports, &agriculture), Some(5.0));
    let y = db.matrix("baseline", MatrixName::Y).unwrap();
    assert_eq!(y.value(&agriculture, &exports), Some(15.0));

    assert_eq!(db.units().get(Level::SatelliteAccount, "CO2 (Gg)"), Some("Gg"));
    assert_eq!(db.units().get(Level::Sector, "Agriculture"), Some("USD'000"));
}

#[test]
fn eora_single_region_keeps_partners_apart() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("IO_ITA_2015_BasicPrice.txt");
    eora_single_fixture(&file);

    let opts = EoraOptions {
        aggregate_trade: false,
        name_convention: NameConvention::Abbreviation,
        ..Default::default()
    };
    let db = parse_eora(&file, &opts).unwrap();
    assert_eq!(db.indices().regions(), ["ITA"]);
    let factors = db.indices().items(Level::FactorOfProduction);
    assert!(factors.contains(&"Imports from FRA".to_string()));
    assert!(factors.contains(&"Imports from DEU".to_string()));
    let categories = db.indices().items(Level::ConsumptionCategory);
    assert!(categories.contains(&"Exports to FRA".to_string()));
}

#[test]
fn eora_multi_region_needs_year_and_indices() {
    let opts = EoraOptions {
        multi_region: true,
        ..Default::default()
    };
    let err = parse_eora(Path::new("/does/not/exist"), &opts).unwrap_err();
    assert!(matches!(err, Error::MissingArgument(_)), "{err}");
}

fn eora_multi_fixture(data: &Path, index: &Path) {
    let tab = b'\t';
    write(
        &index.join("labels_T.txt"),
        &[
            &["Italy", "ITA", "Industries", "Agriculture"],
            &["France", "FRA", "Industries", "Agriculture"],
            &["RoW", "ROW", "Industries", "Total"],
        ],
        tab,
    );
    write(
        &index.join("labels_FD.txt"),
        &[
            &["Italy", "ITA", "Final Demand", "Household final consumption P.3h"],
            &["France", "FRA", "Final Demand", "Household final consumption P.3h"],
            &["RoW", "ROW", "Final Demand", "Household final consumption P.3h"],
        ],
        tab,
    );
    write(
        &index.join("labels_VA.txt"),
        &[&["Primary Inputs", "Compensation of employees D.1"]],
        tab,
    );
    write(&index.join("labels_Q.txt"), &[&["CO2 (Gg)"]], tab);

    let block = |name: &str, rows: &[&[&str]]| {
        write(&data.join(format!("Eora26_2015_bp_{name}.txt")), rows, tab)
    };
    block("T", &[&["10", "2", "3"], &["4", "20", "5"], &["6", "7", "0"]]);
    block("FD", &[&["50", "5", "1"], &["8", "60", "2"], &["0", "0", "0"]]);
    block("VA", &[&["30", "40", "9"]]);
    block("Q", &[&["1", "2", "3"]]);
    block("QY", &[&["0.5", "0.6", "0.7"]]);
}

#[test]
fn eora_multi_region_removes_rest_of_world() {
    let data = tempfile::tempdir().unwrap();
    let index = tempfile::tempdir().unwrap();
    eora_multi_fixture(data.path(), index.path());

    let mut opts = EoraOptions {
        multi_region: true,
        index_path: Some(index.path().to_path_buf()),
        ..Default::default()
    };
    opts.model.year = Some(2015);
    let db = parse_eora(data.path(), &opts).unwrap();

    assert_eq!(db.indices().regions(), ["Italy", "France"]);
    assert_eq!(
        db.metadata().notes,
        vec![
            "ROW deleted from database due to inconsistency.",
            "Intermediate imports from ROW added to VA matrix",
            "Intermediate exports to ROW added to Y matrix",
        ]
    );

    let z = db.matrix("baseline", MatrixName::Z).unwrap();
    assert_eq!(z.data, vec![10.0, 2.0, 4.0, 20.0]);

    let it = Label::regional("Italy", Level::Sector, "Agriculture");
    let fr = Label::regional("France", Level::Sector, "Agriculture");
    let y = db.matrix("baseline", MatrixName::Y).unwrap();
    let it_exports = Label::regional("Italy", Level::ConsumptionCategory, "Exports to ROW");
    let fr_exports = Label::regional("France", Level::ConsumptionCategory, "Exports to ROW");
    assert_eq!(y.value(&it, &it_exports), Some(4.0));
    assert_eq!(y.value(&fr, &fr_exports), Some(7.0));
    assert_eq!(y.value(&it, &fr_exports), Some(0.0));

    let imports = Label::global(Level::FactorOfProduction, "Imports from ROW");
    let v = db.matrix("baseline", MatrixName::V).unwrap();
    assert_eq!(v.value(&imports, &it), Some(6.0));
    assert_eq!(v.value(&imports, &fr), Some(7.0));

    assert_eq!(db.matrix("baseline", MatrixName::EY).unwrap().data, vec![0.5, 0.6, 0.0, 0.0]);
}

#[test]
fn eora_multi_region_as_dynamic_database() {
    let data = tempfile::tempdir().unwrap();
    let index = tempfile::tempdir().unwrap();
    eora_multi_fixture(data.path(), index.path());

    let mut opts = EoraOptions {
        multi_region: true,
        index_path: Some(index.path().to_path_buf()),
        ..Default::default()
    };
    opts.model.model = ModelKind::Dynamic;
    opts.model.year = Some(2015);
    let db = parse_eora(data.path(), &opts).unwrap();
    assert_eq!(db.scenarios(), vec![ScenarioKey::Year(2015)]);
}

// ---------------------------------------------------------------------------
// eurostat
// ---------------------------------------------------------------------------

fn supply_sheet(year: &str) -> Grid {
    grid(&[
        &["TIME", year],
        &["GEO", "Italy"],
        &["", "", ""],
        &["", "Food", "Goods"],
        &["Farming", "90", "2"],
        &["Retail", "1", "70"],
        &["Imports", "10", "20"],
    ])
}

fn use_sheet() -> Grid {
    grid(&[
        &["TIME", "2015"],
        &["GEO", "Italy"],
        &["UNIT", "Million euro"],
        &["", "", ""],
        &["", "Farming", "Retail", "Final consumption", "Exports"],
        &["Food", "10", "20", "50", "5"],
        &["Goods", "15", "5", "40", "8"],
        &["Wages", "30", "25", "", ""],
        &["Taxes", "3", "4", ":", ":"],
    ])
}

fn eurostat_options() -> EurostatOptions {
    let mut opts = EurostatOptions::new("Italy", 2015);
    opts.consumption_categories = vec!["Final consumption".into(), "Exports".into()];
    opts.factors_of_production = vec!["Wages".into(), "Taxes".into()];
    opts.imports = vec!["Imports".into()];
    opts
}

#[test]
fn eurostat_pair_from_workbooks() {
    let supply = MemoryWorkbook::new()
        .with_sheet("2014", supply_sheet("2014"))
        .with_sheet("2015", supply_sheet("2015"));
    let usage = MemoryWorkbook::new().with_sheet("2015", use_sheet());

    let db = parse_eurostat_source(&supply, &usage, &eurostat_options()).unwrap();
    assert_eq!(db.table(), TableKind::Sut);
    assert_eq!(db.metadata().source.as_deref(), Some(EUROSTAT_SOURCE));
    assert_eq!(db.metadata().year, Some(2015));

    let farming = Label::regional("Italy", Level::Activity, "Farming");
    let retail = Label::regional("Italy", Level::Activity, "Retail");
    let food = Label::regional("Italy", Level::Commodity, "Food");
    let goods = Label::regional("Italy", Level::Commodity, "Goods");
    let z = db.matrix("baseline", MatrixName::Z).unwrap();
    assert_eq!(z.value(&farming, &food), Some(90.0));
    assert_eq!(z.value(&food, &retail), Some(20.0));

    let exports = Label::regional("Italy", Level::ConsumptionCategory, "Exports");
    assert_eq!(db.matrix("baseline", MatrixName::Y).unwrap().value(&goods, &exports), Some(8.0));

    let v = db.matrix("baseline", MatrixName::V).unwrap();
    let imports = Label::global(Level::FactorOfProduction, "Imports");
    let wages = Label::global(Level::FactorOfProduction, "Wages");
    assert_eq!(v.value(&imports, &goods), Some(20.0));
    assert_eq!(v.value(&wages, &farming), Some(30.0));

    let e = db.matrix("baseline", MatrixName::E).unwrap();
    assert!(e.data.iter().all(|x| *x == 0.0));
    assert_eq!(db.units().get(Level::Commodity, "Food"), Some("Million EUR"));
}

#[test]
fn eurostat_reports_missing_year_and_labels() {
    let supply = MemoryWorkbook::new().with_sheet("2015", supply_sheet("2015"));
    let usage = MemoryWorkbook::new().with_sheet("2015", use_sheet());

    let mut opts = eurostat_options();
    opts.model.year = None;
    let err = parse_eurostat_source(&supply, &usage, &opts).unwrap_err();
    assert!(matches!(err, Error::MissingArgument(_)), "{err}");

    let mut opts = eurostat_options();
    opts.model.year = Some(2016);
    let err = parse_eurostat_source(&supply, &usage, &opts).unwrap_err();
    assert!(err.to_string().contains("2016"), "{err}");

    let mut opts = eurostat_options();
    opts.consumption_categories.push("Changes in inventories".into());
    let err = parse_eurostat_source(&supply, &usage, &opts).unwrap_err();
    assert!(err.to_string().contains("Changes in inventories"), "{err}");
}

#[test]
fn eurostat_pair_from_csv_directories() {
    let supply = tempfile::tempdir().unwrap();
    let usage = tempfile::tempdir().unwrap();
    write_grid(&supply.path().join("supply_2015.csv"), &supply_sheet("2015"), b',').unwrap();
    write_grid(&usage.path().join("use_2015.csv"), &use_sheet(), b',').unwrap();

    let db = parse_eurostat(supply.path(), usage.path(), &eurostat_options()).unwrap();
    assert_eq!(db.indices().items(Level::Activity), ["Farming", "Retail"]);
    assert_eq!(db.indices().items(Level::Commodity), ["Food", "Goods"]);
}
