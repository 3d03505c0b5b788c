use inequality_dashboard::generate_dashboard_summary;
use inequality_dashboard::summary::Dataset;
use inequality_dashboard::table::Table;

fn table(csv: &str) -> Table {
    Table::parse(csv.as_bytes()).unwrap()
}

#[test]
fn two_country_summary() {
    let t = table("country,year,gini\nA,2000,10\nA,2001,20\nB,2002,30\n");
    assert_eq!(
        generate_dashboard_summary(&t),
        "Dashboard Insights:\n\
         - Number of countries: 2\n\
         - Year range: 2000 - 2002\n\
         - Average Gini index: 20.0\n\
         - Top 5 countries by inequality: B, A\n\
         - Lowest inequality countries: A, B"
    );
}

#[test]
fn rankings_follow_country_means() {
    let mut csv = String::from("country,year,gini\n");
    let rows = [
        ("Norway", 27.0),
        ("South Africa", 63.0),
        ("Brazil", 53.4),
        ("Germany", 31.7),
        ("India", 35.7),
        ("China", 38.5),
        ("United States", 41.4),
    ];
    for (country, gini) in rows {
        csv.push_str(&format!("{},2019,{}\n", country, gini));
    }
    let summary = generate_dashboard_summary(&table(&csv));

    assert!(summary.contains("- Number of countries: 7"));
    assert!(summary.contains("- Year range: 2019 - 2019"));
    assert!(summary.contains(
        "- Top 5 countries by inequality: South Africa, Brazil, United States, China, India"
    ));
    assert!(summary.contains(
        "- Lowest inequality countries: Norway, Germany, India, China, United States"
    ));
}

#[test]
fn mean_is_rounded_to_two_places() {
    let t = table("country,year,gini\nA,2000,10\nB,2000,10\nC,2000,11\n");
    assert!(generate_dashboard_summary(&t).contains("- Average Gini index: 10.33"));
}

#[test]
fn missing_columns_drop_their_lines() {
    let no_gini = generate_dashboard_summary(&table("country,year\nA,2000\nB,2001\n"));
    assert_eq!(
        no_gini,
        "Dashboard Insights:\n- Number of countries: 2\n- Year range: 2000 - 2001"
    );

    let only_gini = generate_dashboard_summary(&table("gini\n30\n40\n"));
    assert_eq!(only_gini, "Dashboard Insights:\n- Average Gini index: 35.0");

    let nothing = generate_dashboard_summary(&table("region,value\nX,1\n"));
    assert_eq!(nothing, "Dashboard Insights:\n");
}

#[test]
fn column_names_ignore_case_and_padding() {
    let t = table(" Country ,YEAR,Gini\nA,2000,20\n");
    let summary = generate_dashboard_summary(&t);
    assert!(summary.contains("- Number of countries: 1"));
    assert!(summary.contains("- Average Gini index: 20.0"));
}

#[test]
fn blank_and_non_numeric_gini_values_are_skipped() {
    let t = table("country,year,gini\nA,2000,\nA,2001,n/a\nB,2000,40\nC,2000,\n");
    let summary = generate_dashboard_summary(&t);
    assert!(summary.contains("- Number of countries: 3"));
    assert!(summary.contains("- Average Gini index: 40.0"));
    assert!(summary.contains("- Top 5 countries by inequality: B\n"));
}

#[test]
fn upload_computes_the_summary_once() {
    let csv = b"country,year,gini\nA,2000,20\nB,2001,20\n";
    let dataset = Dataset::from_upload("gini.CSV", csv).unwrap();
    assert_eq!(dataset.file_name, "gini.CSV");
    assert_eq!(dataset.table.rows.len(), 2);
    assert_eq!(dataset.summary, generate_dashboard_summary(&dataset.table));
}

#[cfg(feature = "web")]
#[test]
fn spreadsheet_upload_reads_the_first_sheet() {
    use inequality_dashboard::export::to_xlsx;

    let t = table("country,year,gini\nA,2000,20.5\nB,2001,30\n");
    let bytes = to_xlsx(&t, "data").unwrap();

    let dataset = Dataset::from_upload("gini.xlsx", &bytes).unwrap();
    assert_eq!(dataset.table.header, vec!["country", "year", "gini"]);
    assert_eq!(dataset.table.rows[0], vec!["A", "2000", "20.5"]);
    assert_eq!(dataset.table.rows[1], vec!["B", "2001", "30"]);
    assert!(dataset.summary.contains("- Year range: 2000 - 2001"));
    assert!(dataset.summary.contains("- Average Gini index: 25.25"));
}
