//! Extraction over the sample voicemail set.

use vmindex_extract::{FieldExtractor, extract};

const MARK: &str = "Hi John, this is Mark from Acme Corp. I'm following up on our discussion last week about the partnership agreement. Could you give me a call back when you have a chance? My direct line is 555-123-4567. Thanks, I look forward to moving this forward.";
const PETERSON: &str = "Hello, this is Dr. Peterson's office calling to reschedule your quarterly business medical checkup. Please call us back at 555-867-5309 to confirm or find another time. Thank you.";
const SARAH: &str = "Hey there, it's Sarah from TechBridge Solutions. I wanted to discuss the upcoming software deployment scheduled for next weekend. Could you call me back at 555-789-1234 to discuss mitigation strategies?";
const MICHAEL: &str = "This is Michael Johnson from Legal Advisors Inc. I've prepared the contract revisions you requested last month. You can reach me at 555-321-9876 or through my assistant at extension 4321.";
const EMMA: &str = "Hi, this is Emma from Marketing Innovations. Just following up on the campaign proposal we submitted last week. My number is 555-444-7890.";

#[test]
fn acme_corp() {
    let fields = extract(MARK);
    assert_eq!(fields.name.as_deref(), Some("Mark"));
    assert_eq!(fields.company.as_deref(), Some("Acme Corp"));
    assert_eq!(fields.phone_numbers, vec!["555-123-4567"]);
}

#[test]
fn its_introduction() {
    let fields = extract(SARAH);
    assert_eq!(fields.name.as_deref(), Some("Sarah"));
    assert_eq!(fields.company.as_deref(), Some("TechBridge Solutions"));
    assert_eq!(fields.phone_numbers, vec!["555-789-1234"]);
}

#[test]
fn two_word_name_and_extension() {
    let fields = extract(MICHAEL);
    assert_eq!(fields.name.as_deref(), Some("Michael Johnson"));
    assert_eq!(fields.company.as_deref(), Some("Legal Advisors Inc"));
    assert_eq!(fields.phone_numbers, vec!["555-321-9876", "extension 4321"]);
}

#[test]
fn marketing_innovations() {
    let fields = extract(EMMA);
    assert_eq!(fields.name.as_deref(), Some("Emma"));
    assert_eq!(fields.company.as_deref(), Some("Marketing Innovations"));
    assert_eq!(fields.phone_numbers, vec!["555-444-7890"]);
}

#[test]
fn office_call_falls_back_to_name_only() {
    // Loose name-only match on "Dr" is an accepted false positive.
    let fields = extract(PETERSON);
    assert_eq!(fields.name.as_deref(), Some("Dr"));
    assert_eq!(fields.company, None);
    assert_eq!(fields.phone_numbers, vec!["555-867-5309"]);
}

#[test]
fn default_extractor_matches_free_function() {
    let extractor = FieldExtractor::with_defaults().expect("default rules should compile");
    for text in [MARK, PETERSON, SARAH, MICHAEL, EMMA] {
        assert_eq!(extractor.extract(text), extract(text));
    }
}
