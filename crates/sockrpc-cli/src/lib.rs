// Copyright 2025 sockrpc Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # sockrpc CLI
//!
//! Command-line interface for running a sockrpc server and making one-off
//! calls against it.
//!
//! ## Key Commands
//!
//! - `sockrpc serve`: Serve the stock handlers on a Unix socket
//! - `sockrpc call`: Make an RPC call (outputs raw JSON for scripting)
//!
//! Both commands take the socket from `--socket`, from a JSON config file
//! given with `--config`, or from both, in which case the flag wins.

pub mod settings;
