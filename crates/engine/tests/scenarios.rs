// End-to-end scenarios through the store, pipeline and selectors.

use datadeck_engine::filter::apply_filters;
use datadeck_engine::{
    to_csv, AggregationSpec, CellValue, ChartConfig, Column, ColumnFilter, DatasetStore,
    DateFormat, FilterCondition, FilterOperator, Locale, MetricSpec, NumberFormat, Pipeline,
    Reducer, SelectorCache, SelectorKey, SortDirection, SortEdit, SortLevel, Update,
};

fn qty_store() -> DatasetStore {
    let mut store = DatasetStore::default();
    let update: Update = serde_json::from_str(
        r#"{
            "kind": "load",
            "columns": [{"id": "c1", "name": "Qty", "type": "number"}],
            "rows": [["1,234"], ["-50"], ["abc"]]
        }"#,
    )
    .unwrap();
    assert!(store.apply(update).changed);
    store
}

#[test]
fn qty_parse_errors_and_positive_filter() {
    let mut store = qty_store();

    let errors = serde_json::to_value(store.validation()).unwrap();
    assert_eq!(errors["parseErrors"], serde_json::json!({"2": [0]}));

    let filter: ColumnFilter = serde_json::from_str(
        r#"{"columnId": "c1", "conditions": [{"operator": "greater_than", "value": 0}]}"#,
    )
    .unwrap();
    store.apply(Update::SetColumnFilter { filter });

    let mut pipeline = Pipeline::new();
    let view = pipeline.view(&store);
    assert_eq!(view.row_count(), 1);
    assert_eq!(view.source_rows(0), vec![0]);
    assert_eq!(view.cell(0, 0), &CellValue::from("1,234"));
}

#[test]
fn sort_level_column_swap() {
    let mut store = DatasetStore::default();
    store.apply(Update::Load {
        columns: vec![Column::text("c1", "A"), Column::text("c2", "B")],
        rows: vec![],
    });
    store.apply(Update::SetSort {
        levels: vec![
            SortLevel::new("c1", SortDirection::Asc),
            SortLevel::new("c2", SortDirection::Desc),
        ],
    });
    store.apply(Update::EditSort {
        edit: SortEdit::SetColumn {
            index: 0,
            column_id: "c2".into(),
        },
    });
    assert_eq!(
        store.sort().levels(),
        &[
            SortLevel::new("c2", SortDirection::Asc),
            SortLevel::new("c1", SortDirection::Desc),
        ]
    );
}

#[test]
fn european_locale_end_to_end() {
    let locale = Locale::new(NumberFormat::new('.', ','), DateFormat::new("DD.MM.YYYY"));
    let mut store = DatasetStore::new(Default::default(), locale);
    store.apply(Update::Load {
        columns: vec![
            Column::text("item", "Item"),
            Column::number("price", "Price"),
            Column::date("sold", "Sold"),
        ],
        rows: vec![
            vec!["Tea".into(), "1.234,50".into(), "05.03.2024".into()],
            vec!["Cake".into(), "12,5".into(), "2024-01-20".into()],
            vec!["Jam".into(), "zwölf".into(), "31.02.2024".into()],
        ],
    });
    assert_eq!(store.validation().row_errors(2), &[1, 2]);
    assert_eq!(store.validation().error_count(), 2);

    store.apply(Update::SetSort {
        levels: vec![SortLevel::new("sold", SortDirection::Asc)],
    });
    let mut pipeline = Pipeline::new();
    let table = pipeline.view(&store).to_display_table(store.locale());
    assert_eq!(table.headers, vec!["Item", "Price", "Sold"]);
    assert_eq!(table.rows[0], vec!["Cake", "12,5", "20.01.2024"]);
    assert_eq!(table.rows[1], vec!["Tea", "1.234,50", "05.03.2024"]);

    let csv = to_csv(&table).unwrap();
    assert!(csv.starts_with("\"Item\",\"Price\",\"Sold\"\n\"Cake\",\"12,5\",\"20.01.2024\"\n"));
}

#[test]
fn date_range_filter_respects_granularity() {
    let mut store = DatasetStore::default();
    store.apply(Update::Load {
        columns: vec![Column::date("m", "Month").with_date_format("MM/YYYY")],
        rows: vec![
            vec!["01/2024".into()],
            vec!["02/2024".into()],
            vec!["2024-02-27".into()],
            vec!["03/2024".into()],
            vec![CellValue::Empty],
        ],
    });
    let filters = vec![ColumnFilter::single(
        "m",
        FilterCondition::between("02/2024", "02/2024"),
    )];
    let rows = apply_filters(store.dataset(), &filters, store.locale());
    assert_eq!(rows, vec![1, 2]);
}

#[test]
fn aggregated_view_keeps_original_for_pickers() {
    let mut store = DatasetStore::default();
    store.apply(Update::Load {
        columns: vec![Column::text("region", "Region"), Column::number("qty", "Qty")],
        rows: vec![
            vec!["North".into(), "10".into()],
            vec!["South".into(), "4".into()],
            vec!["North".into(), "1,000".into()],
        ],
    });
    store.apply(Update::SetAggregation {
        spec: Some(AggregationSpec::new(
            vec!["region".into()],
            vec![
                MetricSpec::new("qty", Reducer::Sum),
                MetricSpec::new("qty", Reducer::Count),
            ],
        )),
    });

    let mut pipeline = Pipeline::new();
    let view = pipeline.view(&store);
    assert!(view.is_aggregated());
    let table = view.to_display_table(store.locale());
    assert_eq!(table.headers, vec!["Region", "Qty (sum)", "Qty (count)"]);
    assert_eq!(table.rows[0], vec!["North", "1,010", "2"]);
    assert_eq!(view.source_rows(0), vec![0, 2]);

    let picker = store.unique_values(1, 50);
    let displays: Vec<&str> = picker.iter().map(|u| u.display.as_str()).collect();
    assert_eq!(displays, vec!["4", "10", "1,000"]);

    let chart: ChartConfig = serde_json::from_str(
        r#"{"type": "pie", "labelColumn": "Region", "valueColumn": "Qty (sum)"}"#,
    )
    .unwrap();
    let data = chart.project(&table, &store.locale().number).unwrap();
    assert_eq!(data.labels, vec!["North", "South"]);
    assert_eq!(data.series[0].values, vec![Some(1010.0), Some(4.0)]);
}

#[test]
fn selectors_follow_store_updates() {
    let mut store = qty_store();
    let mut cache = SelectorCache::new();
    let row2 = cache.selector(SelectorKey::RowHasErrors(2));
    let row0 = cache.selector(SelectorKey::RowSelected(0));
    assert!(cache.read(row2, &store).as_flag());
    assert!(!cache.read(row0, &store).as_flag());

    store.apply(Update::EditCell {
        row: 2,
        col: 0,
        value: "3".into(),
    });
    assert!(!cache.read(row2, &store).as_flag());
    cache.read(row0, &store);
    assert_eq!(cache.recompute_count(row0), 1);

    let filter = ColumnFilter::single(
        "c1",
        FilterCondition::new(FilterOperator::Between, "10"),
    );
    assert!(store
        .validate_filter_condition("c1", &filter.conditions[0])
        .is_err());
}
