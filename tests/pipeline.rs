use compos_layout::table::Stage;
use compos_layout::{analyze_layout, process_compos_json, RecognitionParams};
use pretty_assertions::assert_eq;

mod common;
use common::{column, column_of, compo, table};

const ICON_ROW_JSON: &str = r#"{"compos": [
    {"id": 1, "class": "Image", "height": 20, "width": 20,
     "position": {"column_min": 0, "row_min": 0, "column_max": 20, "row_max": 20}},
    {"id": 2, "class": "Image", "height": 20, "width": 20,
     "position": {"column_min": 100, "row_min": 0, "column_max": 120, "row_max": 20}},
    {"id": 3, "class": "Image", "height": 20, "width": 20,
     "position": {"column_min": 200, "row_min": 0, "column_max": 220, "row_max": 20}},
    {"id": 4, "class": "Text", "height": 10, "width": 20, "text_content": "Home",
     "position": {"column_min": 0, "row_min": 30, "column_max": 20, "row_max": 40}},
    {"id": 5, "class": "Text", "height": 10, "width": 20, "text_content": "Search",
     "position": {"column_min": 100, "row_min": 30, "column_max": 120, "row_max": 40}},
    {"id": 6, "class": "Text", "height": 10, "width": 20, "text_content": "Profile",
     "position": {"column_min": 200, "row_min": 30, "column_max": 220, "row_max": 40}}
]}"#;

fn values(table: &compos_layout::ComposTable, name: &str) -> Vec<String> {
    column(table, name).into_iter().map(|(_, v)| v).collect()
}

#[test]
fn test_icon_row_with_labels() {
    let (_, table) = process_compos_json(ICON_ROW_JSON, &RecognitionParams::default()).unwrap();

    assert_eq!(table.stage(), Stage::Listed);
    assert_eq!(values(&table, "group"), vec!["nt-0", "nt-0", "nt-0", "t-0", "t-0", "t-0"]);
    assert_eq!(values(&table, "alignment_in_group"), vec!["h"; 6]);
    assert_eq!(values(&table, "gap"), vec!["80", "80", "-1", "80", "80", "-1"]);
    assert_eq!(values(&table, "group_pair"), vec!["0"; 6]);
    assert_eq!(values(&table, "pair_to"), vec!["4", "5", "6", "1", "2", "3"]);
    assert_eq!(values(&table, "list_item"), vec!["0", "1", "2", "0", "1", "2"]);
}

#[test]
fn test_csv_carries_every_label_column() {
    let (csv, table) = process_compos_json(ICON_ROW_JSON, &RecognitionParams::default()).unwrap();
    let mut lines = csv.lines();

    assert_eq!(
        lines.next(),
        Some(
            "id,class,column_min,column_max,row_min,row_max,height,width,area,center,center_column,center_row,\
             text_content,children,parent,group_pair,group,alignment_in_group,gap,pair_to,list_item"
        )
    );
    assert_eq!(
        lines.next(),
        Some("1,Image,0,20,0,20,20,20,400,\"(10.0, 10.0)\",10.0,10.0,,-1,-1,0,nt-0,h,80,4,0")
    );
    assert_eq!(lines.count(), 5);
    let ids: Vec<u32> = table.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_scattered_components_stay_unlabelled() {
    let table = table(vec![
        compo(1, "Image", 0, 0, 20, 20),
        compo(2, "Text", 300, 200, 360, 215),
        compo(3, "Button", 150, 400, 260, 440),
    ]);

    let table = analyze_layout(table, &RecognitionParams::default()).unwrap();

    for name in ["group_pair", "group", "alignment_in_group", "gap", "pair_to", "list_item"] {
        assert_eq!(values(&table, name), vec!["-1"; 3], "column {name}");
    }
}

#[test]
fn test_analysis_can_be_rerun() {
    let (_, table) = process_compos_json(ICON_ROW_JSON, &RecognitionParams::default()).unwrap();
    let before: Vec<String> = values(&table, "pair_to");

    let table = analyze_layout(table, &RecognitionParams::default()).unwrap();

    assert_eq!(values(&table, "pair_to"), before);
    assert_eq!(values(&table, "group_pair"), vec!["1"; 6]);
    // item ids keep counting
    assert_eq!(column_of(&table, "list_item", 1), "3");
}

#[test]
fn test_malformed_input_is_an_error() {
    assert!(process_compos_json("{\"compos\": [{\"id\": 1}]}", &RecognitionParams::default()).is_err());
    assert!(process_compos_json("not json", &RecognitionParams::default()).is_err());
}
