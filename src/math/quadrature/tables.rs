/*
    Asteria, numerical astronomy toolkit
    Copyright (C) 2025 Asteria contributors

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

//! Precomputed Gauss and Gauss-Kronrod node/weight tables (QUADPACK
//! values), stored as `(node, weight)` pairs over the non-negative half of
//! [-1, 1] in descending node order, the center node (if any) last. The
//! negative half follows by symmetry.
//!
//! Within each Kronrod table the Gauss nodes sit at the odd indices, so the
//! embedded Gauss estimate reuses the same function samples.

/// 7-point Gauss rule, embedded in [`KRONROD_15`].
pub const GAUSS_7: [(f64, f64); 4] = [
    (0.949107912342759, 0.129484966168870),
    (0.741531185599394, 0.279705391489277),
    (0.405845151377397, 0.381830050505119),
    (0.000000000000000, 0.417959183673469),
];

/// 15-point Kronrod extension of the 7-point Gauss rule.
pub const KRONROD_15: [(f64, f64); 8] = [
    (0.991455371120813, 0.022935322010529),
    (0.949107912342759, 0.063092092629979),
    (0.864864423359769, 0.104790010322250),
    (0.741531185599394, 0.140653259715525),
    (0.586087235467691, 0.169004726639267),
    (0.405845151377397, 0.190350578064785),
    (0.207784955007898, 0.204432940075298),
    (0.000000000000000, 0.209482141084728),
];

/// 10-point Gauss rule, embedded in [`KRONROD_21`].
pub const GAUSS_10: [(f64, f64); 5] = [
    (0.973906528517172, 0.066671344308688),
    (0.865063366688985, 0.149451349150581),
    (0.679409568299024, 0.219086362515982),
    (0.433395394129247, 0.269266719309996),
    (0.148874338981631, 0.295524224714753),
];

/// 21-point Kronrod extension of the 10-point Gauss rule (the default
/// rule).
pub const KRONROD_21: [(f64, f64); 11] = [
    (0.995657163025808, 0.011694638867371),
    (0.973906528517172, 0.032558162307964),
    (0.930157491355708, 0.054755896574352),
    (0.865063366688985, 0.075039674810919),
    (0.780817726586417, 0.093125454583697),
    (0.679409568299024, 0.109387158802298),
    (0.562757134668605, 0.123491976262066),
    (0.433395394129247, 0.134709217311473),
    (0.294392862701460, 0.142775938577060),
    (0.148874338981631, 0.147739104901338),
    (0.000000000000000, 0.149445554002917),
];

/// 15-point Gauss rule, embedded in [`KRONROD_31`].
pub const GAUSS_15: [(f64, f64); 8] = [
    (0.987992518020485, 0.030753241996117),
    (0.937273392400706, 0.070366047488108),
    (0.848206583410427, 0.107159220467172),
    (0.724417731360170, 0.139570677926154),
    (0.570972172608539, 0.166269205816994),
    (0.394151347077563, 0.186161000015562),
    (0.201194093997435, 0.198431485327112),
    (0.000000000000000, 0.202578241925561),
];

/// 31-point Kronrod extension of the 15-point Gauss rule.
pub const KRONROD_31: [(f64, f64); 16] = [
    (0.998002298693397, 0.005377479872923),
    (0.987992518020485, 0.015007947329316),
    (0.967739075679140, 0.025460847326715),
    (0.937273392400706, 0.035346360791376),
    (0.897264532344082, 0.044589751324764),
    (0.848206583410427, 0.053481524690928),
    (0.790418501442466, 0.062009567800670),
    (0.724417731360170, 0.069854121318728),
    (0.650996741297417, 0.076849680757720),
    (0.570972172608539, 0.083080502823133),
    (0.485081863640239, 0.088564443056212),
    (0.394151347077563, 0.093126598170825),
    (0.299180007153169, 0.096642726983623),
    (0.201194093997435, 0.099173598721792),
    (0.101142066918717, 0.100769845523876),
    (0.000000000000000, 0.101330007014792),
];
