// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
pub mod search_trade_documents;
pub mod search_user_document;
pub mod search_web;
