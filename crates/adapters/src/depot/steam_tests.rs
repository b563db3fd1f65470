// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const MANIFEST: &str = r#"
"AppState"
{
	"appid"		"258550"
	"name"		"Dedicated Server"
	"StateFlags"		"4"
	"buildid"		"12345678"
	"lastupdated"		"1731680000"
}
"#;

#[test]
fn manifest_build_id_is_extracted() {
    assert_eq!(
        parse_manifest_build_id(MANIFEST),
        Some("12345678".to_string())
    );
}

#[test]
fn manifest_without_build_id_yields_none() {
    assert_eq!(parse_manifest_build_id("\"AppState\"\n{\n}\n"), None);
    assert_eq!(parse_manifest_build_id(""), None);
}

const APP_INFO: &str = r#"
"258550"
{
	"depots"
	{
		"branches"
		{
			"public"
			{
				"buildid"		"20000001"
				"timeupdated"		"1731680000"
			}
			"staging"
			{
				"buildid"		"20000002"
				"description"		"staging branch"
			}
		}
	}
}
"#;

#[test]
fn app_info_build_id_for_public_branch() {
    assert_eq!(
        parse_app_info_build_id(APP_INFO, "public"),
        Some("20000001".to_string())
    );
}

#[test]
fn app_info_build_id_for_named_branch() {
    assert_eq!(
        parse_app_info_build_id(APP_INFO, "staging"),
        Some("20000002".to_string())
    );
}

#[test]
fn app_info_unknown_branch_yields_none() {
    assert_eq!(parse_app_info_build_id(APP_INFO, "aux"), None);
}

#[test]
fn app_info_without_branches_yields_none() {
    assert_eq!(parse_app_info_build_id("\"258550\"\n{\n}\n", "public"), None);
}

#[test]
fn beta_channel_mapping() {
    assert_eq!(SteamCmdDepot::beta_channel(""), "public");
    assert_eq!(SteamCmdDepot::beta_channel("main"), "public");
    assert_eq!(SteamCmdDepot::beta_channel("staging"), "staging");
}
