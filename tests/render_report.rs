use inspect_grade::{
    grading::GradePreset,
    model::{Inspection, ItemStatus},
    report::{HtmlSummaryRenderer, JsonRenderer, Language, render_inspection},
};

fn mk_inspection() -> Inspection {
    let mut insp = Inspection::new("r1", "Dana <Owner> & Co", "2024-09-10");
    insp.property_location = "Marina Tower 12".into();
    insp.property_type = "Apartment".into();
    insp.inspector_name = "Sam".into();
    let kitchen = insp.add_area("Kitchen").unwrap();
    let a = insp.add_item(&kitchen, "Plumbing", "Sink drain", ItemStatus::Fail).unwrap();
    insp.set_comment(&kitchen, &a, Some("slow drain".into())).unwrap();
    insp.add_photo(&kitchen, &a, "data:image/png;base64,iVBORw0KGgo=").unwrap();
    insp.add_photo(&kitchen, &a, "photo_1725950000_1").unwrap();
    for i in 0..9 {
        insp.add_item("area-1", "Walls", format!("Panel {i}"), ItemStatus::Pass).unwrap();
    }
    insp
}

#[test]
fn html_contains_recomputed_grade_and_escapes_text() {
    let insp = mk_inspection();
    let renderer = HtmlSummaryRenderer::new(Language::En, None).unwrap();
    let html = render_inspection(&renderer, &insp, &GradePreset::SixGrade.table()).unwrap();

    // 9 pass / 1 fail -> 90% / 10% -> B
    assert!(html.contains("<strong>B</strong>"));
    assert!(html.contains("Dana &lt;Owner&gt; &amp; Co"));
    assert!(!html.contains("<Owner>"));
    assert!(html.contains("<img class=\"photo\" src=\"data:image/png;base64,iVBORw0KGgo=\""));
    assert!(html.contains("<span class=\"photo-key\">photo_1725950000_1</span>"));
    assert!(html.contains("dir=\"ltr\""));
}

#[test]
fn arabic_is_right_to_left() {
    let insp = mk_inspection();
    let renderer = HtmlSummaryRenderer::new(Language::Ar, None).unwrap();
    let html = render_inspection(&renderer, &insp, &GradePreset::FivePlusGrade.table()).unwrap();
    assert!(html.contains("lang=\"ar\" dir=\"rtl\""));
    assert!(html.contains("التقييم"));
    // 90% pass under the five-plus table
    assert!(html.contains("<strong>A</strong>"));
}

#[test]
fn bilingual_labels_carry_both_languages() {
    let insp = mk_inspection();
    let renderer = HtmlSummaryRenderer::new(Language::Bilingual, Some("Handover Report".into())).unwrap();
    let html = render_inspection(&renderer, &insp, &GradePreset::SixGrade.table()).unwrap();
    assert!(html.contains("Grade / التقييم"));
    assert!(html.contains("<h1>Handover Report</h1>"));
}

#[test]
fn json_render_reflects_live_state() {
    let mut insp = mk_inspection();
    let table = GradePreset::SixGrade.table();
    let renderer = JsonRenderer { pretty: false };

    let before: serde_json::Value =
        serde_json::from_str(&render_inspection(&renderer, &insp, &table).unwrap()).unwrap();
    assert_eq!(before["report"]["grade"], "B");

    let kitchen_item = insp.areas[1].items[0].id.clone();
    insp.set_status("area-2", &kitchen_item, ItemStatus::Pass).unwrap();
    let after: serde_json::Value =
        serde_json::from_str(&render_inspection(&renderer, &insp, &table).unwrap()).unwrap();
    assert_eq!(after["report"]["grade"], "AAA");
    assert_eq!(after["report"]["total"], 10);
}
