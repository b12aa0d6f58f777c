use inspect_grade::{
    error::GradeError,
    grading::GradePreset,
    model::{Inspection, ItemStatus},
    report::compute_inspection_grade,
};

fn mk_inspection(pass: usize, fail: usize, snags: usize) -> Inspection {
    let mut insp = Inspection::new("t1", "Test Client", "2024-06-01");
    let statuses = std::iter::repeat_n(ItemStatus::Pass, pass)
        .chain(std::iter::repeat_n(ItemStatus::Fail, fail))
        .chain(std::iter::repeat_n(ItemStatus::Snags, snags));
    for (i, status) in statuses.enumerate() {
        insp.add_item("area-1", "General", format!("point {i}"), status)
            .unwrap();
    }
    insp
}

#[test]
fn six_grade_nineteen_of_twenty_is_a() {
    let insp = mk_inspection(19, 1, 0);
    let r = compute_inspection_grade(&insp, &GradePreset::SixGrade.table()).unwrap();
    assert_eq!(r.pass_percentage.value(), 95.0);
    assert_eq!(r.fail_percentage.value(), 5.0);
    assert_eq!(r.grade, "A");
}

#[test]
fn six_grade_all_pass_is_aaa() {
    let insp = mk_inspection(10, 0, 0);
    let r = compute_inspection_grade(&insp, &GradePreset::SixGrade.table()).unwrap();
    assert_eq!(r.grade, "AAA");
    assert_eq!(r.grade_rank, 0);
}

#[test]
fn six_grade_half_fail_is_d() {
    let insp = mk_inspection(5, 5, 0);
    let r = compute_inspection_grade(&insp, &GradePreset::SixGrade.table()).unwrap();
    assert_eq!(r.pass_percentage.value(), 50.0);
    assert_eq!(r.fail_percentage.value(), 50.0);
    assert_eq!(r.grade, "D");
}

#[test]
fn five_plus_all_pass_is_a_plus() {
    let insp = mk_inspection(10, 0, 0);
    let r = compute_inspection_grade(&insp, &GradePreset::FivePlusGrade.table()).unwrap();
    assert_eq!(r.grade, "A+");
}

#[test]
fn five_plus_one_fail_in_ten_is_a() {
    let insp = mk_inspection(9, 1, 0);
    let r = compute_inspection_grade(&insp, &GradePreset::FivePlusGrade.table()).unwrap();
    assert_eq!(r.pass_percentage.value(), 90.0);
    assert_eq!(r.grade, "A");
}

#[test]
fn snags_do_not_count_as_fail() {
    // 19 pass + 1 snag: 95% pass, 0% fail
    let insp = mk_inspection(19, 0, 1);
    let r = compute_inspection_grade(&insp, &GradePreset::SixGrade.table()).unwrap();
    assert_eq!(r.grade, "AAA");
    assert_eq!(r.summary.snags, 1);
    assert_eq!(r.snags_percentage.value(), 5.0);
}

#[test]
fn zero_items_yield_zero_percentages_and_lowest_grade() {
    let mut no_areas = Inspection::new("t0", "Empty", "2024-06-01");
    no_areas.areas.clear();
    let empty_area = Inspection::new("t0", "Empty", "2024-06-01");

    for insp in [no_areas, empty_area] {
        for preset in [GradePreset::SixGrade, GradePreset::FivePlusGrade] {
            let r = compute_inspection_grade(&insp, &preset.table()).unwrap();
            assert_eq!(r.summary.total, 0);
            assert_eq!(r.pass_percentage.value(), 0.0);
            assert_eq!(r.fail_percentage.value(), 0.0);
            assert_eq!(r.grade, "D");
        }
    }
}

#[test]
fn raw_inputs_out_of_range_fail_fast() {
    let t = GradePreset::SixGrade.table();
    assert!(matches!(t.classify_raw(101.0, 0.0), Err(GradeError::InvalidInput(_))));
    assert!(matches!(t.classify_raw(90.0, -1.0), Err(GradeError::InvalidInput(_))));
    assert!(matches!(t.classify_raw(f64::NAN, 0.0), Err(GradeError::InvalidInput(_))));
}

#[test]
fn grade_follows_edits() {
    let mut insp = mk_inspection(10, 0, 0);
    let table = GradePreset::SixGrade.table();
    let before = compute_inspection_grade(&insp, &table).unwrap();

    let item_id = insp.areas[0].items[0].id.clone();
    insp.set_status("area-1", &item_id, ItemStatus::Fail).unwrap();
    let after = compute_inspection_grade(&insp, &table).unwrap();

    assert_eq!(before.grade, "AAA");
    assert_eq!(after.grade, "B");
    assert_ne!(before.fingerprint, after.fingerprint);
}

#[test]
fn report_serializes_flat_camel_case() {
    let insp = mk_inspection(3, 1, 0);
    let r = compute_inspection_grade(&insp, &GradePreset::SixGrade.table()).unwrap();
    let v = serde_json::to_value(&r).unwrap();
    assert_eq!(v["total"], 4);
    assert_eq!(v["pass"], 3);
    assert_eq!(v["fail"], 1);
    assert_eq!(v["snags"], 0);
    assert_eq!(v["passPercentage"], 75.0);
    assert_eq!(v["failPercentage"], 25.0);
    assert_eq!(v["grade"], "D");
}
