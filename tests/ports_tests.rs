use portsweep::error::ScanError;
use portsweep::ports::PortSelection;

#[test]
fn comma_list_mixes_singles_and_ranges_in_first_seen_order() {
    let sel = PortSelection::parse_list("443, 22,8000-8002, 22 ,8001").expect("parse ok");
    assert_eq!(sel, PortSelection::List(vec![443, 22, 8000, 8001, 8002]));
    assert_eq!(sel.len(), 5);
}

#[test]
fn comma_list_spanning_lines_with_comments() {
    let input = "21,22 # remote access\n\n80,443,8080 # web\n,,\n";
    let sel = PortSelection::parse_list(input).expect("parse ok");
    assert_eq!(sel.iter().collect::<Vec<u16>>(), vec![21, 22, 80, 443, 8080]);
}

#[test]
fn bad_entry_anywhere_in_comma_list_is_invalid_ports() {
    for input in ["22,0", "22,65536", "80,90-85", "80,,ssh"] {
        let err = PortSelection::parse_list(input).expect_err(input);
        assert!(matches!(err, ScanError::InvalidPorts(_)), "{input}: {err}");
    }
}

#[test]
fn first_n_matches_contiguous_range() {
    let sel = PortSelection::first_n(1024).expect("valid count");
    let ports: Vec<u16> = sel.iter().collect();
    assert_eq!(ports.len(), 1024);
    assert_eq!(ports.first(), Some(&1));
    assert_eq!(ports.last(), Some(&1024));
}
